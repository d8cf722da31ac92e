use embassy_time::Instant;
use esp_radio::wifi::{
    event::{self, EventExt},
    AuthMethod, ClientConfig, ModeConfig, PromiscuousPkt, Sniffer, WifiController, WifiError,
};
use netbadge::{
    capture::{offer, FrameMeta},
    radio::LinkTracker,
    LinkState, RadioDriver, WifiCredentials,
};

use super::config::CAPTURE_QUEUE;

// The promiscuous buffer still carries the 802.11 FCS.
const FCS_LEN: usize = 4;

static LINK: LinkTracker = LinkTracker::new();

unsafe extern "C" {
    fn esp_wifi_set_channel(primary: u8, second: u32) -> i32;
}

#[derive(Debug)]
pub(crate) enum RadioError {
    Wifi(WifiError),
    Channel(i32),
    Credentials,
}

impl From<WifiError> for RadioError {
    fn from(err: WifiError) -> Self {
        Self::Wifi(err)
    }
}

/// Station controller plus sniffer behind the scan core's driver trait.
pub(crate) struct EspRadio {
    controller: WifiController<'static>,
    sniffer: Sniffer<'static>,
}

impl EspRadio {
    pub(crate) fn new(controller: WifiController<'static>, mut sniffer: Sniffer<'static>) -> Self {
        sniffer.set_receive_cb(on_promiscuous_frame);
        install_link_handlers();
        Self {
            controller,
            sniffer,
        }
    }

    fn ensure_started(&mut self) -> Result<(), RadioError> {
        if !matches!(self.controller.is_started(), Ok(true)) {
            self.controller
                .set_config(&ModeConfig::Client(ClientConfig::default()))?;
            self.controller.start()?;
        }
        Ok(())
    }
}

impl RadioDriver for EspRadio {
    type Error = RadioError;

    fn set_channel(&mut self, channel: u8) -> Result<(), Self::Error> {
        // Second channel 0 is WIFI_SECOND_CHAN_NONE.
        let code = unsafe { esp_wifi_set_channel(channel, 0) };
        if code == 0 {
            Ok(())
        } else {
            Err(RadioError::Channel(code))
        }
    }

    fn enable_capture(&mut self) -> Result<(), Self::Error> {
        self.ensure_started()?;
        self.sniffer.set_promiscuous_mode(true)?;
        log::debug!("radio: capture on");
        Ok(())
    }

    fn disable_capture(&mut self) -> Result<(), Self::Error> {
        self.sniffer.set_promiscuous_mode(false)?;
        log::debug!("radio: capture off");
        Ok(())
    }

    fn set_client_mode(&mut self) -> Result<(), Self::Error> {
        LINK.reset();
        self.ensure_started()
    }

    fn connect(&mut self, credentials: &WifiCredentials) -> Result<(), Self::Error> {
        let mode = client_config(credentials).ok_or(RadioError::Credentials)?;
        self.controller.set_config(&mode)?;
        LINK.connect_started();
        if let Err(err) = self.controller.connect() {
            LINK.connect_rejected();
            return Err(err.into());
        }
        Ok(())
    }

    fn link_state(&mut self) -> LinkState {
        LINK.state()
    }

    fn disconnect(&mut self) -> Result<(), Self::Error> {
        LINK.disconnect_requested();
        self.controller.disconnect().map_err(RadioError::from)
    }
}

fn client_config(credentials: &WifiCredentials) -> Option<ModeConfig> {
    let ssid = core::str::from_utf8(credentials.ssid()).ok()?;
    let password = core::str::from_utf8(credentials.password()).ok()?;
    let auth_method = if password.is_empty() {
        AuthMethod::None
    } else {
        AuthMethod::Wpa2Personal
    };
    Some(ModeConfig::Client(
        ClientConfig::default()
            .with_ssid(ssid.into())
            .with_password(password.into())
            .with_auth_method(auth_method),
    ))
}

fn on_promiscuous_frame(packet: PromiscuousPkt<'_>) {
    let data = packet.data;
    let frame = &data[..data.len().saturating_sub(FCS_LEN)];
    let meta = FrameMeta {
        channel: packet.rx_cntl.channel as u8,
        rssi: packet.rx_cntl.rssi.clamp(i8::MIN as i32, i8::MAX as i32) as i8,
        rx_ms: Instant::now().as_millis(),
    };
    offer(&CAPTURE_QUEUE, frame, meta);
}

fn install_link_handlers() {
    event::StaConnected::update_handler(|event| {
        LINK.on_connected();
        log::info!("radio: associated channel={}", event.channel());
    });

    event::StaDisconnected::update_handler(|event| {
        if LINK.on_disconnected() {
            log::info!("radio: disconnected reason={}", event.reason());
        } else {
            log::debug!("radio: expected disconnect reason={}", event.reason());
        }
    });
}
