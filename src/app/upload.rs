use core::fmt::Write as _;
use core::net::Ipv4Addr;

use embassy_net::{dns::DnsQueryType, tcp::TcpSocket, IpAddress, Stack};
use embassy_time::{with_timeout, Duration, Instant};
use embedded_io_async::Write;
use heapless::String;
use netbadge::{
    config::{BADGE_ID, FIRMWARE_VERSION, UPLOAD_HOST, UPLOAD_KEY, UPLOAD_PATH, UPLOAD_PORT},
    upload::{
        find_header_end, is_success, parse_status_code, payload_len, write_head, write_record,
        write_request_head, PayloadHeader,
    },
    NetworkRecord,
};

use super::{
    config::{DHCP_WAIT_MS, HTTP_RESPONSE_MAX, HTTP_RW_BUF},
    types::UploadError,
};

// Worst case record: a fully escaped 32 byte SSID plus the fixed fields.
const RECORD_BUF: usize = 448;
const HEAD_BUF: usize = 320;

/// POSTs the table snapshot to the collector. The whole exchange, DHCP wait
/// included, is bounded by `timeout_ms`.
pub(crate) async fn post_networks(
    stack: Stack<'static>,
    records: &[NetworkRecord],
    timeout_ms: u32,
) -> Result<(), UploadError> {
    let host = UPLOAD_HOST.ok_or(UploadError::NoHost)?;
    match with_timeout(
        Duration::from_millis(timeout_ms as u64),
        deliver(stack, host, records),
    )
    .await
    {
        Ok(result) => result,
        Err(_) => Err(UploadError::Timeout),
    }
}

async fn deliver(
    stack: Stack<'static>,
    host: &str,
    records: &[NetworkRecord],
) -> Result<(), UploadError> {
    let mut rx_buffer = [0u8; HTTP_RW_BUF];
    let mut tx_buffer = [0u8; HTTP_RW_BUF];

    if with_timeout(Duration::from_millis(DHCP_WAIT_MS), stack.wait_config_up())
        .await
        .is_err()
    {
        return Err(UploadError::NoAddress);
    }
    let address = resolve(stack, host).await?;

    let mut socket = TcpSocket::new(stack, &mut rx_buffer[..], &mut tx_buffer[..]);
    socket.set_timeout(Some(Duration::from_secs(5)));
    socket
        .connect((address, UPLOAD_PORT))
        .await
        .map_err(|_| UploadError::Connect)?;

    let header = PayloadHeader {
        badge_id: BADGE_ID,
        firmware_version: FIRMWARE_VERSION,
        timestamp_ms: Instant::now().as_millis(),
        battery_voltage: None,
    };
    let result = exchange(&mut socket, host, &header, records).await;
    socket.close();
    result
}

async fn exchange(
    socket: &mut TcpSocket<'_>,
    host: &str,
    header: &PayloadHeader<'_>,
    records: &[NetworkRecord],
) -> Result<(), UploadError> {
    let mut head: String<HEAD_BUF> = String::new();
    write_request_head(
        &mut head,
        host,
        UPLOAD_PATH,
        UPLOAD_KEY,
        payload_len(header, records),
    )
    .map_err(|_| UploadError::Write)?;
    socket
        .write_all(head.as_bytes())
        .await
        .map_err(|_| UploadError::Write)?;

    head.clear();
    write_head(&mut head, header).map_err(|_| UploadError::Write)?;
    socket
        .write_all(head.as_bytes())
        .await
        .map_err(|_| UploadError::Write)?;

    let mut chunk: String<RECORD_BUF> = String::new();
    for (index, record) in records.iter().enumerate() {
        chunk.clear();
        if index > 0 {
            chunk.write_char(',').map_err(|_| UploadError::Write)?;
        }
        write_record(&mut chunk, record).map_err(|_| UploadError::Write)?;
        socket
            .write_all(chunk.as_bytes())
            .await
            .map_err(|_| UploadError::Write)?;
    }
    socket
        .write_all(b"]}")
        .await
        .map_err(|_| UploadError::Write)?;
    socket.flush().await.map_err(|_| UploadError::Write)?;

    let status = read_status(socket).await?;
    log::info!(
        "upload: collector status={} records={}",
        status,
        records.len()
    );
    if is_success(status) {
        Ok(())
    } else {
        Err(UploadError::Status(status))
    }
}

async fn read_status(socket: &mut TcpSocket<'_>) -> Result<u16, UploadError> {
    let mut response = [0u8; HTTP_RESPONSE_MAX];
    let mut filled = 0usize;
    while filled < response.len() {
        let read = socket
            .read(&mut response[filled..])
            .await
            .map_err(|_| UploadError::Read)?;
        if read == 0 {
            break;
        }
        filled += read;
        if find_header_end(&response[..filled]).is_some() {
            break;
        }
    }
    parse_status_code(&response[..filled]).ok_or(UploadError::BadResponse)
}

async fn resolve(stack: Stack<'static>, host: &str) -> Result<IpAddress, UploadError> {
    if let Ok(ip) = host.parse::<Ipv4Addr>() {
        return Ok(IpAddress::Ipv4(ip));
    }
    let addresses = stack
        .dns_query(host, DnsQueryType::A)
        .await
        .map_err(|_| UploadError::Dns)?;
    addresses.first().copied().ok_or(UploadError::Dns)
}
