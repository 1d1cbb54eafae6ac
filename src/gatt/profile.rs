//! The CHIPoBLE GATT profile exposed by a commissionable accessory

use bitflags::bitflags;

use crate::core::uuid::Uuid;

/// The Matter BLE service (16-bit UUID 0xFFF6)
pub const MATTER_SERVICE_UUID: Uuid = Uuid::new(0xFFF6);
/// Commissioner -> accessory writes (C1)
pub const WRITE_CHARACTERISTIC_UUID: Uuid = Uuid::from_u128(0x18EE2EF5_263D_4559_959F_4F9C429F9D11);
/// Accessory -> commissioner indications (C2)
pub const INDICATE_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0x18EE2EF5_263D_4559_959F_4F9C429F9D12);
/// Additional commissioning data (C3), not used by the transport itself
pub const READ_CHARACTERISTIC_UUID: Uuid = Uuid::from_u128(0x64630238_8772_45F2_B87D_748A83218F04);
/// Client Characteristic Configuration Descriptor
pub const CCCD_UUID: Uuid = Uuid::new(0x2902);

/// CCCD value enabling notifications
pub const ENABLE_NOTIFICATION_VALUE: [u8; 2] = [0x01, 0x00];
/// CCCD value enabling indications
pub const ENABLE_INDICATION_VALUE: [u8; 2] = [0x02, 0x00];
/// CCCD value disabling both
pub const DISABLE_NOTIFICATION_VALUE: [u8; 2] = [0x00, 0x00];

/// Adapter name used unless configured otherwise
pub const DEFAULT_DEVICE_NAME: &str = "Matter Device";

bitflags! {
    /// GATT characteristic properties (Core Spec 5.3 Vol 3G 3.3.1.1)
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CharacteristicProperties: u8 {
        /// Read
        const READ = 0x02;
        /// Write without response
        const WRITE_WITHOUT_RESPONSE = 0x04;
        /// Write
        const WRITE = 0x08;
        /// Notify
        const NOTIFY = 0x10;
        /// Indicate
        const INDICATE = 0x20;
    }
}

bitflags! {
    /// Local attribute access permissions
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AttPermissions: u8 {
        /// Readable
        const READ = 0x01;
        /// Writable
        const WRITE = 0x10;
    }
}

/// What a written CCCD value asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CccdValue {
    /// Enable indications
    EnableIndication,
    /// Enable notifications
    EnableNotification,
    /// Disable both
    Disable,
}

impl CccdValue {
    /// Classify a raw descriptor value; None if unrecognized
    pub fn parse(value: &[u8]) -> Option<Self> {
        match value {
            v if v == ENABLE_INDICATION_VALUE => Some(Self::EnableIndication),
            v if v == ENABLE_NOTIFICATION_VALUE => Some(Self::EnableNotification),
            v if v == DISABLE_NOTIFICATION_VALUE => Some(Self::Disable),
            _ => None,
        }
    }

    /// Raw descriptor value
    pub fn bytes(&self) -> [u8; 2] {
        match self {
            Self::EnableIndication => ENABLE_INDICATION_VALUE,
            Self::EnableNotification => ENABLE_NOTIFICATION_VALUE,
            Self::Disable => DISABLE_NOTIFICATION_VALUE,
        }
    }
}

/// A GATT descriptor, local or discovered on a remote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GattDescriptor {
    /// Descriptor type
    pub uuid: Uuid,
    /// Access permissions
    pub permissions: AttPermissions,
}

/// A GATT characteristic, local or discovered on a remote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GattCharacteristic {
    /// Characteristic type
    pub uuid: Uuid,
    /// Declared properties
    pub properties: CharacteristicProperties,
    /// Access permissions
    pub permissions: AttPermissions,
    /// Attached descriptors
    pub descriptors: Vec<GattDescriptor>,
}

/// A primary GATT service, local or discovered on a remote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GattService {
    /// Service type
    pub uuid: Uuid,
    /// Contained characteristics
    pub characteristics: Vec<GattCharacteristic>,
}

impl GattCharacteristic {
    /// Look up an attached descriptor
    pub fn descriptor(&self, uuid: Uuid) -> Option<&GattDescriptor> {
        self.descriptors.iter().find(|d| d.uuid == uuid)
    }
}

impl GattService {
    /// Look up a contained characteristic
    pub fn characteristic(&self, uuid: Uuid) -> Option<&GattCharacteristic> {
        self.characteristics.iter().find(|c| c.uuid == uuid)
    }
}

/// The CHIPoBLE service with its write, indicate (+CCCD) and read
/// characteristics
pub fn matter_service() -> GattService {
    GattService {
        uuid: MATTER_SERVICE_UUID,
        characteristics: vec![
            GattCharacteristic {
                uuid: WRITE_CHARACTERISTIC_UUID,
                properties: CharacteristicProperties::WRITE_WITHOUT_RESPONSE,
                permissions: AttPermissions::WRITE,
                descriptors: vec![],
            },
            GattCharacteristic {
                uuid: INDICATE_CHARACTERISTIC_UUID,
                properties: CharacteristicProperties::INDICATE,
                permissions: AttPermissions::READ,
                descriptors: vec![GattDescriptor {
                    uuid: CCCD_UUID,
                    permissions: AttPermissions::READ | AttPermissions::WRITE,
                }],
            },
            GattCharacteristic {
                uuid: READ_CHARACTERISTIC_UUID,
                properties: CharacteristicProperties::READ,
                permissions: AttPermissions::READ,
                descriptors: vec![],
            },
        ],
    }
}
