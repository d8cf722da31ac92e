use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, channel::Channel};

use netbadge::capture::{new_queue, CaptureQueue};

use super::types::BadgeEvent;

pub(crate) const BUTTON_DEBOUNCE_MS: u64 = 50;
pub(crate) const STATUS_LOG_INTERVAL_SECONDS: u64 = 60;
pub(crate) const HEAP_SIZE: usize = 72 * 1024;

pub(crate) const WIFI_RX_QUEUE_SIZE: usize = 3;
pub(crate) const WIFI_TX_QUEUE_SIZE: usize = 2;
pub(crate) const WIFI_STATIC_RX_BUF_NUM: u8 = 8;
pub(crate) const WIFI_DYNAMIC_RX_BUF_NUM: u16 = 16;
pub(crate) const WIFI_DYNAMIC_TX_BUF_NUM: u16 = 8;
pub(crate) const WIFI_RX_BA_WIN: u8 = 3;

pub(crate) const HTTP_RW_BUF: usize = 1536;
pub(crate) const HTTP_RESPONSE_MAX: usize = 256;
pub(crate) const DHCP_WAIT_MS: u64 = 5_000;

pub(crate) static CAPTURE_QUEUE: CaptureQueue = new_queue();
pub(crate) static BADGE_EVENTS: Channel<CriticalSectionRawMutex, BadgeEvent, 4> = Channel::new();
