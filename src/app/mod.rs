mod config;
mod radio;
mod types;
mod upload;

use embassy_futures::select::{select, Either};
use embassy_net::{Runner, Stack, StackResources};
use embassy_time::{Duration, Instant, Ticker, Timer};
use esp_hal::{
    gpio::{Input, InputConfig, Pull},
    rng::Rng,
    timer::timg::TimerGroup,
};
use esp_radio::wifi::{Config as WifiRuntimeConfig, WifiDevice};
use netbadge::{
    config::{
        HopPolicy, UploadPolicy, AUTO_START_SCANNING, BADGE_ID, CONTROL_LOOP_PERIOD_MS,
        FIRMWARE_VERSION, NETWORK_CAPACITY, NETWORK_SLOTS,
    },
    telemetry, ModeOutput, NetworkTable, ScanEngine, WifiCredentials,
};
use static_cell::StaticCell;

use self::{
    config::{
        BADGE_EVENTS, BUTTON_DEBOUNCE_MS, CAPTURE_QUEUE, HEAP_SIZE, STATUS_LOG_INTERVAL_SECONDS,
        WIFI_DYNAMIC_RX_BUF_NUM, WIFI_DYNAMIC_TX_BUF_NUM, WIFI_RX_BA_WIN, WIFI_RX_QUEUE_SIZE,
        WIFI_STATIC_RX_BUF_NUM, WIFI_TX_QUEUE_SIZE,
    },
    radio::EspRadio,
    types::{BadgeEvent, UploadError},
};

type BadgeEngine = ScanEngine<'static, EspRadio, NETWORK_SLOTS>;

pub(crate) fn run() -> ! {
    esp_println::logger::init_logger(log::LevelFilter::Info);
    let peripherals = esp_hal::init(esp_hal::Config::default());
    esp_alloc::heap_allocator!(size: HEAP_SIZE);
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    log::info!("badge: boot id={} fw={}", BADGE_ID, FIRMWARE_VERSION);

    static RADIO_CTRL: StaticCell<esp_radio::Controller<'static>> = StaticCell::new();
    static STACK_RESOURCES: StaticCell<StackResources<3>> = StaticCell::new();

    let radio_ctrl = match esp_radio::init() {
        Ok(ctrl) => RADIO_CTRL.init(ctrl),
        Err(err) => {
            log::error!("badge: radio init failed err={:?}", err);
            halt_forever();
        }
    };
    let (controller, ifaces) =
        match esp_radio::wifi::new(radio_ctrl, peripherals.WIFI, wifi_runtime_config()) {
            Ok(parts) => parts,
            Err(err) => {
                log::error!("badge: wifi init failed err={:?}", err);
                halt_forever();
            }
        };

    let rng = Rng::new();
    let seed = (rng.random() as u64) << 32 | rng.random() as u64;
    let (stack, net_runner) = embassy_net::new(
        ifaces.sta,
        embassy_net::Config::dhcpv4(Default::default()),
        STACK_RESOURCES.init(StackResources::<3>::new()),
        seed,
    );

    let credentials = WifiCredentials::compiled();
    if credentials.is_none() {
        log::warn!("badge: no upload credentials compiled in, windows will fail");
    }
    let engine = ScanEngine::new(
        EspRadio::new(controller, ifaces.sniffer),
        &CAPTURE_QUEUE,
        NetworkTable::with_capacity(NETWORK_CAPACITY),
        HopPolicy::defaults(),
        UploadPolicy::defaults(),
        credentials,
        Instant::now().as_millis(),
    );

    let button = Input::new(
        peripherals.GPIO0,
        InputConfig::default().with_pull(Pull::Up),
    );

    let mut executor = esp_rtos::embassy::Executor::new();
    let executor = unsafe { make_static(&mut executor) };
    executor.run(move |spawner| {
        spawner.must_spawn(net_task(net_runner));
        spawner.must_spawn(scan_task(engine, stack));
        spawner.must_spawn(button_task(button));
        spawner.must_spawn(status_task());
    });
}

#[embassy_executor::task]
async fn scan_task(mut engine: BadgeEngine, stack: Stack<'static>) {
    let transport_timeout_ms = engine.upload_policy().transport_timeout_ms;
    if AUTO_START_SCANNING {
        report(&engine.start_scanning(now_ms()));
    }

    let mut ticker = Ticker::every(Duration::from_millis(CONTROL_LOOP_PERIOD_MS));
    loop {
        match select(ticker.next(), BADGE_EVENTS.receive()).await {
            Either::First(()) => {}
            Either::Second(BadgeEvent::ButtonPressed) => {
                report(&engine.toggle_scanning(now_ms()));
                continue;
            }
        }

        let output = engine.poll(now_ms());
        report(&output.mode);
        if let Some(window) = &output.window {
            report(window);
        }

        if engine.controller().upload_ready() {
            let result =
                upload::post_networks(stack, engine.networks(), transport_timeout_ms).await;
            report(&finish_window(&mut engine, result));
        }
    }
}

fn finish_window(engine: &mut BadgeEngine, result: Result<(), UploadError>) -> ModeOutput {
    let now = now_ms();
    match result {
        Ok(()) => {
            engine.mark_all_consumed();
            engine.end_upload_window(now, true)
        }
        Err(UploadError::Timeout) => {
            // The mode watchdog owns the transport deadline and reports it.
            let output = engine.poll(now).mode;
            if engine.controller().upload_ready() {
                engine.end_upload_window(now, false)
            } else {
                output
            }
        }
        Err(err) => {
            log::warn!("upload: failed err={:?}", err);
            engine.end_upload_window(now, false)
        }
    }
}

fn report(output: &ModeOutput) {
    for notice in &output.notices {
        log::info!("mode: {:?} radio={:?}", notice, output.mode);
    }
    if output.wedged() {
        log::error!("mode: radio wedged, resetting");
        esp_hal::system::software_reset();
    }
}

#[embassy_executor::task]
async fn button_task(mut button: Input<'static>) {
    loop {
        button.wait_for_falling_edge().await;
        Timer::after(Duration::from_millis(BUTTON_DEBOUNCE_MS)).await;
        if button.is_low() {
            let _ = BADGE_EVENTS.try_send(BadgeEvent::ButtonPressed);
            button.wait_for_high().await;
        }
    }
}

#[embassy_executor::task]
async fn status_task() {
    let mut ticker = Ticker::every(Duration::from_secs(STATUS_LOG_INTERVAL_SECONDS));
    loop {
        ticker.next().await;
        let status = telemetry::snapshot();
        log::info!(
            "status: mode={:?} scanning={} networks={} captured={} dropped={} rejected={} hops={} uploads_ok={} uploads_failed={} last={:?}",
            status.mode,
            status.scanning,
            status.network_count,
            status.frames_captured,
            status.frames_queue_dropped,
            status.frames_rejected,
            status.channel_hops,
            status.uploads_ok,
            status.uploads_failed,
            status.last_upload
        );
    }
}

#[embassy_executor::task]
async fn net_task(mut runner: Runner<'static, WifiDevice<'static>>) {
    runner.run().await
}

fn wifi_runtime_config() -> WifiRuntimeConfig {
    WifiRuntimeConfig::default()
        .with_rx_queue_size(WIFI_RX_QUEUE_SIZE)
        .with_tx_queue_size(WIFI_TX_QUEUE_SIZE)
        .with_static_rx_buf_num(WIFI_STATIC_RX_BUF_NUM)
        .with_dynamic_rx_buf_num(WIFI_DYNAMIC_RX_BUF_NUM)
        .with_dynamic_tx_buf_num(WIFI_DYNAMIC_TX_BUF_NUM)
        .with_ampdu_rx_enable(false)
        .with_ampdu_tx_enable(false)
        .with_rx_ba_win(WIFI_RX_BA_WIN)
}

fn now_ms() -> u64 {
    Instant::now().as_millis()
}

unsafe fn make_static<T>(value: &mut T) -> &'static mut T {
    unsafe { core::mem::transmute(value) }
}

fn halt_forever() -> ! {
    loop {
        core::hint::spin_loop();
    }
}
