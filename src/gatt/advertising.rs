//! Commissionable advertising: the flag mask driven by the Matter stack, and
//! the advertisement it produces

use bitflags::bitflags;
use log::{debug, error, info, warn};
use num_traits::clamp;

use crate::core::uuid::Uuid;

use super::{
    bridge::BleBridge,
    callbacks::CommissionableDataProvider,
    events::AdvertiseFailure,
    platform::Permission,
    profile::MATTER_SERVICE_UUID,
};

bitflags! {
    /// State flags toggled by the Matter stack. Bits the bridge does not
    /// name are kept as-is.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct AdvertisingFlags: u64 {
        /// Async init completed
        const ASYNC_INIT_COMPLETED = 0x0001;
        /// BLE layer initialized
        const BLE_LAYER_INITIALIZED = 0x0002;
        /// App registered
        const APP_REGISTERED = 0x0004;
        /// Advertising configured
        const ADVERTISING_CONFIGURED = 0x0008;
        /// Advertising is active
        const ADVERTISING = 0x0010;
        /// A control operation is in progress
        const CONTROL_OP_IN_PROGRESS = 0x0020;
        /// Advertising is enabled. Transitions of this bit start and stop
        /// advertising.
        const ADVERTISING_ENABLED = 0x0040;
        /// Use the fast advertising profile when advertising starts
        const FAST_ADVERTISING_ENABLED = 0x0080;
        /// Use a custom device name
        const USE_CUSTOM_DEVICE_NAME = 0x0100;
        /// Advertising data needs a refresh
        const ADVERTISING_REFRESH_NEEDED = 0x0200;
        /// Service mode enabled
        const SERVICE_MODE_ENABLED = 0x0400;

        const _ = !0;
    }
}

/// Matter BLE opcode for a commissionable device
const OPCODE_COMMISSIONABLE: u8 = 0x00;
/// Advertisement version currently emitted
const ADVERTISEMENT_VERSION: u8 = 0;

/// The 8-byte commissionable service data (Matter Core 5.4.2.5.6)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvertisementPayload {
    /// 4-bit advertisement version
    pub version: u8,
    /// 12-bit discriminator
    pub discriminator: u16,
    /// Vendor id (0 if elided)
    pub vendor_id: u16,
    /// Product id (0 if elided)
    pub product_id: u16,
    /// Whether additional data is available over GATT
    pub additional_data: bool,
}

impl AdvertisementPayload {
    /// Build a payload from the values the Matter stack currently reports
    pub fn from_provider(provider: &dyn CommissionableDataProvider) -> Self {
        Self {
            version: ADVERTISEMENT_VERSION,
            discriminator: provider.discriminator(),
            vendor_id: provider.vendor_id(),
            product_id: provider.product_id(),
            additional_data: false,
        }
    }

    /// Encode to the on-air layout
    pub fn to_bytes(&self) -> [u8; 8] {
        let vd = ((self.version as u16 & 0xF) << 12) | (self.discriminator & 0xFFF);
        let [vd_lo, vd_hi] = vd.to_le_bytes();
        let [vid_lo, vid_hi] = self.vendor_id.to_le_bytes();
        let [pid_lo, pid_hi] = self.product_id.to_le_bytes();
        [
            OPCODE_COMMISSIONABLE,
            vd_lo,
            vd_hi,
            vid_lo,
            vid_hi,
            pid_lo,
            pid_hi,
            self.additional_data as u8,
        ]
    }
}

/// Advertising interval profile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvertiseMode {
    /// Longest interval
    LowPower,
    /// Medium interval
    Balanced,
    /// Shortest interval
    LowLatency,
}

/// Transmit power level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxPowerLevel {
    /// Lowest power
    UltraLow,
    /// Low power
    Low,
    /// Medium power
    Medium,
    /// Highest power
    High,
}

/// Parameters for an advertising set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvertiseSettings {
    /// Interval profile
    pub mode: AdvertiseMode,
    /// Transmit power
    pub tx_power_level: TxPowerLevel,
    /// Whether peers may connect
    pub connectable: bool,
    /// Timeout in milliseconds; 0 advertises until stopped
    pub timeout_ms: u32,
}

impl AdvertiseSettings {
    /// Settings for commissionable advertising
    pub fn commissionable(is_fast_mode: bool) -> Self {
        Self {
            mode: if is_fast_mode { AdvertiseMode::LowLatency } else { AdvertiseMode::LowPower },
            tx_power_level: TxPowerLevel::High,
            connectable: true,
            timeout_ms: 0,
        }
    }
}

// Advertising Data types.
const COMPLETE_LIST_16_BIT_SERVICE_UUIDS: u8 = 0x03;
const COMPLETE_LIST_128_BIT_SERVICE_UUIDS: u8 = 0x07;
const SERVICE_DATA_16_BIT_UUID: u8 = 0x16;
const SERVICE_DATA_128_BIT_UUID: u8 = 0x21;

/// Contents of an advertisement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvertiseData {
    /// Whether the adapter name is included
    pub include_device_name: bool,
    /// Advertised service UUIDs
    pub service_uuids: Vec<Uuid>,
    /// Service data, keyed by service UUID
    pub service_data: Vec<(Uuid, Vec<u8>)>,
}

impl AdvertiseData {
    /// Advertisement for a commissionable accessory
    pub fn commissionable(payload: &AdvertisementPayload) -> Self {
        Self {
            include_device_name: false,
            service_uuids: vec![MATTER_SERVICE_UUID],
            service_data: vec![(MATTER_SERVICE_UUID, payload.to_bytes().to_vec())],
        }
    }

    fn append_adv_data(dest: &mut Vec<u8>, ad_type: u8, ad_payload: &[u8]) {
        let len = clamp(ad_payload.len(), 0, 254);
        dest.push((len + 1) as u8);
        dest.push(ad_type);
        dest.extend(&ad_payload[..len]);
    }

    /// Creates raw AD structures. UUIDs derived from the base UUID are
    /// shortened to 16 bits. The device name, when included, is left for the
    /// platform to fill in.
    pub fn to_raw_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::<u8>::new();

        let mut uu16_services = Vec::<u8>::new();
        let mut uu128_services = Vec::<u8>::new();
        for uuid in &self.service_uuids {
            match uuid.as_u16() {
                Some(short) => uu16_services.extend(short.to_le_bytes()),
                None => uu128_services.extend(uuid.to_bytes().iter().rev()),
            }
        }
        if !uu16_services.is_empty() {
            Self::append_adv_data(&mut bytes, COMPLETE_LIST_16_BIT_SERVICE_UUIDS, &uu16_services);
        }
        if !uu128_services.is_empty() {
            Self::append_adv_data(&mut bytes, COMPLETE_LIST_128_BIT_SERVICE_UUIDS, &uu128_services);
        }

        for (uuid, data) in &self.service_data {
            let mut concated = Vec::<u8>::with_capacity(16 + data.len());
            let ad_type = match uuid.as_u16() {
                Some(short) => {
                    concated.extend(short.to_le_bytes());
                    SERVICE_DATA_16_BIT_UUID
                }
                None => {
                    concated.extend(uuid.to_bytes().iter().rev());
                    SERVICE_DATA_128_BIT_UUID
                }
            };
            concated.extend(data);
            Self::append_adv_data(&mut bytes, ad_type, &concated);
        }

        bytes
    }
}

impl BleBridge {
    /// Set or clear the given flag bits and return the resulting mask.
    /// A change to ADVERTISING_ENABLED starts or stops advertising.
    pub fn set_flag(&self, flags: AdvertisingFlags, is_set: bool) -> AdvertisingFlags {
        let (last, current) = {
            let mut mask = self.flags();
            let last = *mask;
            mask.set(flags, is_set);
            (last, *mask)
        };
        debug!(
            "{} {flags:?} 0x{:x} on flags 0x{:x}",
            if is_set { "Set" } else { "Unset" },
            flags.bits(),
            current.bits()
        );

        if last == current {
            info!("flags not changed (0x{:x})", current.bits());
            return current;
        }

        let was_enabled = last.contains(AdvertisingFlags::ADVERTISING_ENABLED);
        let is_enabled = current.contains(AdvertisingFlags::ADVERTISING_ENABLED);
        match (was_enabled, is_enabled) {
            (false, true) => {
                self.start_advertising(current.contains(AdvertisingFlags::FAST_ADVERTISING_ENABLED))
            }
            (true, false) => self.stop_advertising(),
            _ => {}
        }

        current
    }

    /// Whether any of the given flag bits are set
    pub fn has_flag(&self, flags: AdvertisingFlags) -> bool {
        let has = self.flags().intersects(flags);
        debug!("has flag {flags:?} 0x{:x}: {has}", flags.bits());
        has
    }

    /// The current flag mask
    pub fn current_flags(&self) -> AdvertisingFlags {
        *self.flags()
    }

    fn start_advertising(&self, is_fast_mode: bool) {
        info!("starting advertising, fast mode: {is_fast_mode}");
        if !self.config.enabled {
            info!("BLE disabled, no action");
            return;
        }
        let Some(advertiser) = self.adapter.advertiser() else {
            error!("no LE advertiser available");
            return;
        };

        let settings = AdvertiseSettings::commissionable(is_fast_mode);
        let payload = AdvertisementPayload::from_provider(&*self.commissionable_data);
        let data = AdvertiseData::commissionable(&payload);
        debug!("advertising {MATTER_SERVICE_UUID} with {:02x?}", payload.to_bytes());

        if !self.adapter.has_permission(Permission::Advertise) {
            error!("missing advertise permission");
            return;
        }

        if let Err(err) = advertiser.start_advertising(&settings, &data) {
            error!("failed to start advertising: {err:?}");
        }
    }

    fn stop_advertising(&self) {
        info!("stopping advertising");
        if !self.config.enabled {
            info!("BLE disabled, no action");
            return;
        }
        let Some(advertiser) = self.adapter.advertiser() else {
            error!("no LE advertiser available");
            return;
        };

        if !self.adapter.has_permission(Permission::Advertise) {
            error!("missing advertise permission");
            return;
        }

        if let Err(err) = advertiser.stop_advertising() {
            error!("failed to stop advertising: {err:?}");
        }
    }

    pub(crate) fn on_advertising_started(&self) {
        info!("advertising started");
    }

    pub(crate) fn on_advertising_failed(&self, failure: AdvertiseFailure) {
        warn!("advertising failed to start: {failure:?}");
    }
}
