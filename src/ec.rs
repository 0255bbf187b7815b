// Copyright 2026 The loongson-intc Authors.
// This project is dual-licensed under Apache 2.0 and MIT terms.
// See LICENSE-APACHE and LICENSE-MIT for details.

//! Platform controls of Loongson EA laptops and all-in-ones, through the embedded controller.
//!
//! The embedded controller raises a system control interrupt (SCI) for hotkeys, lid, AC and
//! battery changes. [`EcPlatform::handle_sci_event`] decodes the event number it reports and
//! forwards the result to a [`SciSink`]. Battery and AC state is read from controller registers on
//! demand and converted to the units the power supply class expects.

mod registers;

pub use self::registers::{EcReg, EcWord, PowerStatus};
use core::fmt::{self, Display, Formatter};
use log::{debug, error, info, warn};
use thiserror::Error;

/// Interrupt number of the embedded controller on the Super I/O.
pub const SIO_IRQ: u32 = 14;
/// GPIO interrupt number of the SCI on LS7A boards.
pub const SCI_GPIO_IRQ: u32 = 123;

/// Backlight level reported while the panel is off or the level is unknown.
pub const DEFAULT_BRIGHTNESS: u8 = 25;
/// Highest backlight level.
pub const MAX_BRIGHTNESS: u8 = 100;
/// Level restored when the panel is turned on without a valid saved level.
pub const RESTORE_BRIGHTNESS: u8 = 90;
/// Raw [`EcReg::DisplayBrightness`] value while the panel is off.
const BRIGHTNESS_OFF: u8 = 0xff;

/// Errors from the platform driver.
#[derive(Copy, Clone, Debug, Eq, Error, PartialEq)]
pub enum EcError {
    /// The machine is not a known EA model.
    #[error("Not a Loongson-EA laptop or all-in-one")]
    UnknownModel,
}

/// Access to the embedded controller's registers.
pub trait Ec {
    /// Reads a register.
    fn read(&mut self, reg: EcReg) -> u8;

    /// Writes a register.
    fn write(&mut self, reg: EcReg, value: u8);

    /// Reads a 16-bit value, high byte first.
    fn read_word(&mut self, word: EcWord) -> u16 {
        let (lo, hi) = word.regs();
        let high = self.read(hi);
        let low = self.read(lo);
        (u16::from(high) << 8) | u16::from(low)
    }
}

/// The south bridge or platform controller hub of the machine.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PchType {
    Rs780e,
    Ls7a,
}

/// Model specific behaviour.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Quirks {
    /// Interrupt number of the SCI.
    pub sci_irq: u32,
    pub is_laptop: bool,
    pub is_allinone: bool,
}

impl Quirks {
    pub const DEFAULT: Self = Self {
        sci_irq: SIO_IRQ,
        is_laptop: false,
        is_allinone: false,
    };
    pub const RS780E_LAPTOP: Self = Self {
        sci_irq: SIO_IRQ,
        is_laptop: true,
        is_allinone: false,
    };
    pub const RS780E_ALLINONE: Self = Self {
        sci_irq: SIO_IRQ,
        is_laptop: false,
        is_allinone: true,
    };
    pub const LS7A_LAPTOP: Self = Self {
        sci_irq: SCI_GPIO_IRQ,
        is_laptop: true,
        is_allinone: false,
    };
    pub const LS7A_ALLINONE: Self = Self {
        sci_irq: SCI_GPIO_IRQ,
        is_laptop: false,
        is_allinone: true,
    };

    /// Looks the machine up in the table of known models by its DMI system vendor and product
    /// name.
    pub fn from_dmi(sys_vendor: &str, product_name: &str) -> Option<Self> {
        if !sys_vendor.contains("Loongson") {
            return None;
        }
        let entry = DMI_MODELS
            .iter()
            .find(|entry| product_name.contains(entry.product))?;
        info!("Identified EA device model '{}'", entry.ident);
        Some(entry.quirks)
    }
}

impl Default for Quirks {
    fn default() -> Self {
        Self::DEFAULT
    }
}

struct DmiModel {
    ident: &'static str,
    product: &'static str,
    quirks: Quirks,
}

static DMI_MODELS: [DmiModel; 6] = [
    DmiModel {
        ident: "RS780E laptop",
        product: "EA-L39-RS780E-laptop",
        quirks: Quirks::RS780E_LAPTOP,
    },
    DmiModel {
        ident: "RS780E allinone",
        product: "EA-L41-RS780E-allinone",
        quirks: Quirks::RS780E_ALLINONE,
    },
    DmiModel {
        ident: "LS7A laptop",
        product: "EA-LS3A3000-LS7A-laptop",
        quirks: Quirks::LS7A_LAPTOP,
    },
    DmiModel {
        ident: "LS7A allinone",
        product: "EA-LS3A3000-LS7A-allinone",
        quirks: Quirks::LS7A_ALLINONE,
    },
    DmiModel {
        ident: "EA LS7A laptop",
        product: "EA-LS7A-laptop",
        quirks: Quirks::LS7A_LAPTOP,
    },
    DmiModel {
        ident: "EA LS7A allinone",
        product: "EA-LS7A-allinone",
        quirks: Quirks::LS7A_ALLINONE,
    },
];

/// Identification strings of the machine.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct BoardInfo<'a> {
    /// DMI system vendor.
    pub sys_vendor: &'a str,
    /// DMI product name.
    pub product_name: &'a str,
    /// Board name passed by the firmware.
    pub board_name: &'a str,
}

/// An identified EA machine.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Model {
    pub quirks: Quirks,
    pub is_laptop: bool,
    pub is_allinone: bool,
    /// Lowest backlight level which can be set.
    pub min_brightness: u8,
}

impl Model {
    /// Identifies the machine from DMI, falling back to the firmware board name on machines
    /// booted without DMI tables.
    pub fn identify(board: &BoardInfo) -> Result<Self, EcError> {
        let l39 = board.board_name.contains("L39");
        let l41 = board.board_name.contains("L41");
        let (quirks, min_brightness) =
            match Quirks::from_dmi(board.sys_vendor, board.product_name) {
                Some(quirks) => (quirks, 0),
                None if l39 || l41 => {
                    info!("EA 780E platform with PMON");
                    (Quirks::DEFAULT, if l39 { 5 } else { 0 })
                }
                None => {
                    error!("No matching Loongson-EA model");
                    return Err(EcError::UnknownModel);
                }
            };
        Ok(Self {
            quirks,
            is_laptop: l39 || quirks.is_laptop,
            is_allinone: l41 || quirks.is_allinone,
            min_brightness,
        })
    }
}

/// Returns the interrupt number the SCI is wired to.
pub fn sci_irq(pch: PchType, board_name: &str, quirks: &Quirks) -> u32 {
    let irq = match pch {
        PchType::Rs780e => SIO_IRQ,
        PchType::Ls7a if board_name.contains("L59") || board_name.contains("L60") => SIO_IRQ,
        PchType::Ls7a => quirks.sci_irq,
    };
    info!("Loongson-EA: SCI irq {irq}");
    irq
}

/// Event numbers reported by the embedded controller with an SCI.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum SciEvent {
    Ac = 0x20,
    Battery,
    Lid,
    BrightnessOff,
    BrightnessDown,
    BrightnessUp,
    DisplayToggle,
    Sleep,
    Wlan,
    Touchpad,
    CpuTemp,
    PowerButton,
}

impl SciEvent {
    const ALL: [Self; 12] = [
        Self::Ac,
        Self::Battery,
        Self::Lid,
        Self::BrightnessOff,
        Self::BrightnessDown,
        Self::BrightnessUp,
        Self::DisplayToggle,
        Self::Sleep,
        Self::Wlan,
        Self::Touchpad,
        Self::CpuTemp,
        Self::PowerButton,
    ];

    /// Decodes an event number, or returns `None` if it is outside the handled range.
    pub fn from_number(number: u8) -> Option<Self> {
        let index = number.checked_sub(Self::Ac as u8)?;
        Self::ALL.get(usize::from(index)).copied()
    }

    /// The register read before the event is handled.
    fn status_reg(self) -> Option<EcReg> {
        match self {
            Self::Lid | Self::Battery => Some(EcReg::PowerStatus),
            Self::Wlan => Some(EcReg::DeviceStatus),
            Self::CpuTemp => Some(EcReg::CpuTemp),
            _ => None,
        }
    }

    /// The key reported for the event.
    pub fn key(self) -> Option<KeyCode> {
        match self {
            Self::Sleep => Some(KeyCode::Sleep),
            Self::Touchpad => Some(KeyCode::TouchpadToggle),
            Self::BrightnessOff => Some(KeyCode::DisplayToggle),
            Self::BrightnessDown => Some(KeyCode::BrightnessDown),
            Self::BrightnessUp => Some(KeyCode::BrightnessUp),
            Self::DisplayToggle => Some(KeyCode::SwitchVideoMode),
            Self::Wlan => Some(KeyCode::Wlan),
            Self::PowerButton => Some(KeyCode::Power),
            Self::Ac | Self::Battery | Self::Lid | Self::CpuTemp => None,
        }
    }
}

/// Input key codes reported for hotkeys.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u16)]
pub enum KeyCode {
    Power = 116,
    Sleep = 142,
    BrightnessDown = 224,
    BrightnessUp = 225,
    SwitchVideoMode = 227,
    Wlan = 238,
    DisplayToggle = 0x1af,
    TouchpadToggle = 0x212,
}

/// A power supply whose state can change.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PowerSupply {
    Ac,
    Battery,
}

/// Receives the results of SCI events.
pub trait SciSink {
    /// Reports a hotkey press.
    fn key(&mut self, key: KeyCode);

    /// Reports the lid switch state.
    fn lid(&mut self, closed: bool);

    /// Reports that the state of a power supply changed.
    fn power_supply_changed(&mut self, supply: PowerSupply);

    /// Returns the CPU temperature in millidegrees Celsius.
    fn cpu_temp(&mut self) -> i32;
}

/// Battery charge status, numbered as in the power supply class.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[repr(i32)]
pub enum ChargeStatus {
    #[default]
    Unknown = 0,
    Charging = 1,
    Discharging = 2,
    Full = 4,
}

/// Battery health, numbered as in the power supply class.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[repr(i32)]
pub enum Health {
    #[default]
    Unknown = 0,
    Good = 1,
}

/// Battery technology, numbered as in the power supply class.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[repr(i32)]
pub enum Technology {
    #[default]
    Unknown = 0,
    LiIon = 2,
}

/// The battery serial number, printed in hex, or "Unknown".
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SerialNumber(pub Option<u16>);

impl Display for SerialNumber {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self.0 {
            Some(serial) => write!(f, "{serial:x}"),
            None => f.write_str("Unknown"),
        }
    }
}

/// Power supply state, as last read from the embedded controller.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct PowerInfo {
    pub ac_online: bool,
    pub battery_present: bool,
    pub health: Health,
    pub charge_status: ChargeStatus,
    pub technology: Technology,
    pub serial_number: SerialNumber,
    pub cell_count: u8,
    /// In mAh.
    pub design_capacity: u16,
    /// In mV.
    pub design_voltage: u16,
    /// In mAh.
    pub full_charge_capacity: u16,
}

/// Battery properties, as in the power supply class.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BatteryProperty {
    Status,
    Health,
    Present,
    Technology,
    CycleCount,
    VoltageMaxDesign,
    ChargeFullDesign,
    CurrentNow,
    CurrentAvg,
    VoltageNow,
    ChargeFull,
    ChargeNow,
    Capacity,
    Temp,
    TimeToEmptyAvg,
    TimeToFullAvg,
}

/// Converts a time in minutes, where 0xffff means unknown, to seconds.
fn minutes_to_seconds(minutes: u16) -> i32 {
    if minutes == 0xffff {
        0
    } else {
        i32::from(minutes) * 60
    }
}

/// The platform driver for one machine.
///
/// Methods take `&mut self`. SCI handling and power supply queries on different CPUs must be
/// serialised by the caller.
pub struct EcPlatform<E> {
    ec: E,
    model: Model,
    power: PowerInfo,
    lvds_off: bool,
    saved_brightness: u8,
}

impl<E: Ec> EcPlatform<E> {
    /// Creates the driver for an identified machine.
    ///
    /// On laptops the battery static information is read if a battery is present.
    pub fn new(ec: E, model: Model) -> Self {
        let mut platform = Self {
            ec,
            model,
            power: PowerInfo::default(),
            lvds_off: false,
            saved_brightness: DEFAULT_BRIGHTNESS,
        };
        if model.is_laptop {
            platform.power_status_update();
            if platform.power.battery_present {
                platform.battery_static_update();
            } else {
                error!("The battery does not exist");
            }
        }
        platform
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn power_info(&self) -> &PowerInfo {
        &self.power
    }

    /// Returns the embedded controller.
    pub fn ec(&mut self) -> &mut E {
        &mut self.ec
    }

    /// Reads the AC and battery state.
    ///
    /// A battery reporting a zero design capacity is treated as absent.
    pub fn power_status_update(&mut self) {
        let status = PowerStatus::from_bits_truncate(self.ec.read(EcReg::PowerStatus));

        self.power.ac_online = status.contains(PowerStatus::AC_PRESENT);
        self.power.battery_present = status.contains(PowerStatus::BAT_PRESENT)
            && self.ec.read_word(EcWord::DesignCapacity) != 0;

        if self.power.battery_present {
            self.power.health = Health::Good;
            self.power.charge_status = if status.contains(PowerStatus::BAT_FULL) {
                ChargeStatus::Full
            } else if status.contains(PowerStatus::BAT_CHARGING) {
                ChargeStatus::Charging
            } else {
                ChargeStatus::Discharging
            };
        } else {
            self.power.health = Health::Unknown;
            self.power.charge_status = ChargeStatus::Unknown;
        }
    }

    /// Reads the information which only changes when a battery is inserted.
    pub fn battery_static_update(&mut self) {
        self.power.technology = Technology::LiIon;
        self.power.serial_number = SerialNumber(Some(self.ec.read_word(EcWord::SerialNumber)));
        self.power.cell_count = (self.ec.read_word(EcWord::CellVoltage) / 4200) as u8;
        self.power.design_capacity = self.ec.read_word(EcWord::DesignCapacity);
        self.power.design_voltage = self.ec.read_word(EcWord::DesignVoltage);
        self.power.full_charge_capacity = self.ec.read_word(EcWord::FullChargeCapacity);
        info!(
            "DesignCapacity: {}mAh, DesignVoltage: {}mV, FullChargeCapacity: {}mAh",
            self.power.design_capacity, self.power.design_voltage, self.power.full_charge_capacity
        );
    }

    /// Forgets the information of a removed battery.
    pub fn battery_static_clear(&mut self) {
        self.power.technology = Technology::Unknown;
        self.power.serial_number = SerialNumber(None);
        self.power.cell_count = 0;
        self.power.design_capacity = 0;
        self.power.design_voltage = 0;
    }

    /// Reads a battery property, in power supply class units: µV, µA, µAh, degrees Celsius,
    /// seconds and percent.
    pub fn battery_property(&mut self, prop: BatteryProperty) -> i32 {
        match prop {
            BatteryProperty::VoltageMaxDesign => i32::from(self.power.design_voltage) * 1000,
            BatteryProperty::ChargeFullDesign => i32::from(self.power.design_capacity) * 1000,
            BatteryProperty::Technology => self.power.technology as i32,
            BatteryProperty::Status => {
                self.power_status_update();
                self.power.charge_status as i32
            }
            BatteryProperty::Present => {
                self.power_status_update();
                i32::from(self.power.battery_present)
            }
            BatteryProperty::Health => {
                self.power_status_update();
                self.power.health as i32
            }
            BatteryProperty::CurrentNow => self.battery_signed(EcWord::BatteryCurrent) * 1000,
            BatteryProperty::CurrentAvg => self.battery_signed(EcWord::BatteryAvgCurrent) * 1000,
            BatteryProperty::VoltageNow => {
                self.power_status_update();
                if self.power.battery_present {
                    i32::from(self.ec.read_word(EcWord::BatteryVoltage)) * 1000
                } else {
                    0
                }
            }
            BatteryProperty::Temp => {
                self.power_status_update();
                if self.power.battery_present {
                    // Tenths of a kelvin.
                    i32::from(self.ec.read_word(EcWord::BatteryTemp) as i16) / 10 - 273
                } else {
                    0
                }
            }
            BatteryProperty::ChargeNow => {
                i32::from(self.ec.read_word(EcWord::RemainingCapacity)) * 1000
            }
            BatteryProperty::ChargeFull => {
                self.power.full_charge_capacity = self.ec.read_word(EcWord::FullChargeCapacity);
                i32::from(self.power.full_charge_capacity) * 1000
            }
            BatteryProperty::Capacity => i32::from(self.ec.read(EcReg::BatteryCapacity)),
            BatteryProperty::TimeToEmptyAvg => {
                minutes_to_seconds(self.ec.read_word(EcWord::TimeToEmpty))
            }
            BatteryProperty::TimeToFullAvg => {
                minutes_to_seconds(self.ec.read_word(EcWord::TimeToFull))
            }
            BatteryProperty::CycleCount => i32::from(self.ec.read_word(EcWord::CycleCount)),
        }
    }

    /// Reads a signed battery value, or 0 without a battery.
    fn battery_signed(&mut self, word: EcWord) -> i32 {
        self.power_status_update();
        if self.power.battery_present {
            i32::from(self.ec.read_word(word) as i16)
        } else {
            0
        }
    }

    /// Returns whether AC power is connected.
    pub fn ac_online(&mut self) -> bool {
        self.power_status_update();
        self.power.ac_online
    }

    /// Returns the backlight level.
    pub fn brightness(&mut self) -> u8 {
        if self.lvds_off {
            return DEFAULT_BRIGHTNESS;
        }
        match self.ec.read(EcReg::DisplayBrightness) {
            BRIGHTNESS_OFF => DEFAULT_BRIGHTNESS,
            level => level,
        }
    }

    /// Sets the backlight level, clamped to what the panel supports. Ignored while the panel is
    /// off.
    pub fn set_brightness(&mut self, level: u32) {
        if self.lvds_off {
            debug!("Panel off, ignoring brightness {level}");
            return;
        }
        let level = level.clamp(
            u32::from(self.model.min_brightness),
            u32::from(MAX_BRIGHTNESS),
        );
        self.ec.write(EcReg::DisplayBrightness, level as u8);
    }

    /// Turns the panel off, saving the backlight level.
    pub fn turn_off_lvds(&mut self) {
        self.saved_brightness = self.ec.read(EcReg::DisplayBrightness);
        self.ec.write(EcReg::DisplayBrightness, BRIGHTNESS_OFF);
        self.lvds_off = true;
    }

    /// Turns the panel on, restoring the saved backlight level if it is usable.
    pub fn turn_on_lvds(&mut self) {
        let level = if self.saved_brightness > self.model.min_brightness
            && self.saved_brightness <= MAX_BRIGHTNESS
        {
            self.saved_brightness
        } else {
            RESTORE_BRIGHTNESS
        };
        self.ec.write(EcReg::DisplayBrightness, level);
        self.lvds_off = false;
    }

    /// Returns whether the panel is off.
    pub fn is_lvds_off(&self) -> bool {
        self.lvds_off
    }

    /// Handles the event number reported by the embedded controller for an SCI.
    ///
    /// Returns `false` if the event number is not one the platform handles.
    pub fn handle_sci_event(&mut self, number: u8, sink: &mut impl SciSink) -> bool {
        let Some(event) = SciEvent::from_number(number) else {
            warn!("Ignoring SCI event {number:#x}");
            return false;
        };
        debug!("SCI event {event:?}");

        let status = event.status_reg().map_or(0, |reg| self.ec.read(reg));
        match event {
            SciEvent::Lid => {
                let status = PowerStatus::from_bits_truncate(status);
                sink.lid(!status.contains(PowerStatus::LID_OPEN));
            }
            SciEvent::Ac => sink.power_supply_changed(PowerSupply::Ac),
            SciEvent::Battery => {
                if PowerStatus::from_bits_truncate(status).contains(PowerStatus::BAT_PRESENT) {
                    self.battery_static_update();
                } else {
                    self.battery_static_clear();
                }
                sink.power_supply_changed(PowerSupply::Battery);
            }
            SciEvent::CpuTemp => {
                let celsius = sink.cpu_temp() / 1000;
                self.ec.write(EcReg::CpuTemp, celsius.clamp(0, 255) as u8);
            }
            _ => {}
        }
        if let Some(key) = event.key() {
            sink.key(key);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{FakeEc, RecordingSciSink, SciReport};

    const LS7A_LAPTOP: BoardInfo = BoardInfo {
        sys_vendor: "Loongson",
        product_name: "EA-LS7A-laptop",
        board_name: "LS3A4000-7A1000-1w-EA-V1.0",
    };

    fn laptop_ec() -> FakeEc {
        let mut ec = FakeEc::default();
        ec.set(
            EcReg::PowerStatus,
            (PowerStatus::BAT_PRESENT | PowerStatus::AC_PRESENT | PowerStatus::BAT_CHARGING).bits(),
        );
        ec.set_word(
            EcReg::BatteryDesignCapacityLow,
            EcReg::BatteryDesignCapacityHigh,
            4400,
        );
        ec.set_word(
            EcReg::BatteryDesignVoltageLow,
            EcReg::BatteryDesignVoltageHigh,
            11100,
        );
        ec.set_word(
            EcReg::BatteryCellVoltageLow,
            EcReg::BatteryCellVoltageHigh,
            12600,
        );
        ec.set_word(EcReg::BatterySerialLow, EcReg::BatterySerialHigh, 0xbeef);
        ec.set_word(
            EcReg::BatteryFullChargeCapacityLow,
            EcReg::BatteryFullChargeCapacityHigh,
            4000,
        );
        ec
    }

    fn laptop() -> EcPlatform<FakeEc> {
        EcPlatform::new(laptop_ec(), Model::identify(&LS7A_LAPTOP).unwrap())
    }

    #[test]
    fn identify_by_dmi() {
        let model = Model::identify(&LS7A_LAPTOP).unwrap();
        assert_eq!(model.quirks, Quirks::LS7A_LAPTOP);
        assert!(model.is_laptop);
        assert!(!model.is_allinone);
        assert_eq!(model.min_brightness, 0);

        let allinone = Model::identify(&BoardInfo {
            sys_vendor: "Loongson",
            product_name: "EA-L41-RS780E-allinone",
            board_name: "",
        })
        .unwrap();
        assert_eq!(allinone.quirks, Quirks::RS780E_ALLINONE);
        assert!(allinone.is_allinone);
    }

    #[test]
    fn identify_by_board_name() {
        let l39 = Model::identify(&BoardInfo {
            board_name: "EA-L39",
            ..BoardInfo::default()
        })
        .unwrap();
        assert_eq!(l39.quirks, Quirks::DEFAULT);
        assert!(l39.is_laptop);
        assert_eq!(l39.min_brightness, 5);

        let l41 = Model::identify(&BoardInfo {
            board_name: "EA-L41",
            ..BoardInfo::default()
        })
        .unwrap();
        assert!(l41.is_allinone);
        assert_eq!(l41.min_brightness, 0);

        assert_eq!(
            Model::identify(&BoardInfo {
                sys_vendor: "Other",
                product_name: "EA-LS7A-laptop",
                board_name: "L50",
            }),
            Err(EcError::UnknownModel)
        );
    }

    #[test]
    fn sci_irq_selection() {
        assert_eq!(sci_irq(PchType::Rs780e, "", &Quirks::LS7A_LAPTOP), 14);
        assert_eq!(sci_irq(PchType::Ls7a, "EA-L60", &Quirks::LS7A_LAPTOP), 14);
        assert_eq!(sci_irq(PchType::Ls7a, "EA-L71", &Quirks::LS7A_LAPTOP), 123);
        assert_eq!(sci_irq(PchType::Ls7a, "EA-L71", &Quirks::DEFAULT), 14);
    }

    #[test]
    fn probe_reads_static_battery_info() {
        let platform = laptop();
        let info = platform.power_info();
        assert!(info.ac_online);
        assert!(info.battery_present);
        assert_eq!(info.health, Health::Good);
        assert_eq!(info.charge_status, ChargeStatus::Charging);
        assert_eq!(info.technology, Technology::LiIon);
        assert_eq!(info.cell_count, 3);
        assert_eq!(info.design_capacity, 4400);
        assert_eq!(info.full_charge_capacity, 4000);
        assert_eq!(format!("{}", info.serial_number), "beef");
    }

    #[test]
    fn battery_without_design_capacity_is_absent() {
        let mut ec = laptop_ec();
        ec.set_word(
            EcReg::BatteryDesignCapacityLow,
            EcReg::BatteryDesignCapacityHigh,
            0,
        );
        let mut platform = EcPlatform::new(ec, Model::identify(&LS7A_LAPTOP).unwrap());
        assert!(!platform.power_info().battery_present);
        assert_eq!(platform.power_info().technology, Technology::Unknown);
        assert_eq!(
            platform.battery_property(BatteryProperty::Status),
            ChargeStatus::Unknown as i32
        );
        assert_eq!(platform.battery_property(BatteryProperty::Health), 0);
        assert_eq!(platform.battery_property(BatteryProperty::Present), 0);
        assert_eq!(platform.battery_property(BatteryProperty::Temp), 0);
        assert_eq!(platform.battery_property(BatteryProperty::CurrentNow), 0);
    }

    #[test]
    fn charge_status() {
        let mut platform = laptop();
        platform.ec().set(
            EcReg::PowerStatus,
            (PowerStatus::BAT_PRESENT | PowerStatus::BAT_FULL | PowerStatus::BAT_CHARGING).bits(),
        );
        assert_eq!(platform.battery_property(BatteryProperty::Status), 4);
        assert!(!platform.ac_online());
        platform
            .ec()
            .set(EcReg::PowerStatus, PowerStatus::BAT_PRESENT.bits());
        assert_eq!(platform.battery_property(BatteryProperty::Status), 2);
    }

    #[test]
    fn battery_unit_conversions() {
        let mut platform = laptop();
        let ec = platform.ec();
        ec.set_word(EcReg::BatteryTempLow, EcReg::BatteryTempHigh, 3031);
        ec.set_word(EcReg::BatteryVoltageLow, EcReg::BatteryVoltageHigh, 12000);
        ec.set_word(
            EcReg::BatteryCurrentLow,
            EcReg::BatteryCurrentHigh,
            (-1500i16) as u16,
        );
        ec.set_word(
            EcReg::BatteryRemainingCapacityLow,
            EcReg::BatteryRemainingCapacityHigh,
            2000,
        );
        ec.set_word(EcReg::BatteryTimeToEmptyLow, EcReg::BatteryTimeToEmptyHigh, 90);
        ec.set_word(EcReg::BatteryTimeToFullLow, EcReg::BatteryTimeToFullHigh, 0xffff);
        ec.set(EcReg::BatteryCapacity, 57);

        assert_eq!(platform.battery_property(BatteryProperty::Temp), 30);
        assert_eq!(platform.battery_property(BatteryProperty::VoltageNow), 12_000_000);
        assert_eq!(platform.battery_property(BatteryProperty::CurrentNow), -1_500_000);
        assert_eq!(platform.battery_property(BatteryProperty::ChargeNow), 2_000_000);
        assert_eq!(platform.battery_property(BatteryProperty::TimeToEmptyAvg), 5400);
        assert_eq!(platform.battery_property(BatteryProperty::TimeToFullAvg), 0);
        assert_eq!(platform.battery_property(BatteryProperty::Capacity), 57);
        assert_eq!(
            platform.battery_property(BatteryProperty::ChargeFullDesign),
            4_400_000
        );
        assert_eq!(
            platform.battery_property(BatteryProperty::VoltageMaxDesign),
            11_100_000
        );
    }

    #[test]
    fn brightness_clamping() {
        let mut platform = EcPlatform::new(
            FakeEc::default(),
            Model::identify(&BoardInfo {
                board_name: "L39",
                ..BoardInfo::default()
            })
            .unwrap(),
        );
        platform.set_brightness(200);
        assert_eq!(platform.brightness(), 100);
        platform.set_brightness(2);
        assert_eq!(platform.brightness(), 5);
        platform.ec().set(EcReg::DisplayBrightness, 0xff);
        assert_eq!(platform.brightness(), DEFAULT_BRIGHTNESS);
    }

    #[test]
    fn lvds_off_and_on() {
        let mut platform = laptop();
        platform.set_brightness(60);
        platform.turn_off_lvds();
        assert!(platform.is_lvds_off());
        assert_eq!(platform.ec().regs[&EcReg::DisplayBrightness], 0xff);
        assert_eq!(platform.brightness(), DEFAULT_BRIGHTNESS);
        platform.set_brightness(10);
        assert_eq!(platform.ec().regs[&EcReg::DisplayBrightness], 0xff);
        platform.turn_on_lvds();
        assert_eq!(platform.brightness(), 60);

        // Turning off twice saves the off value, which is not restored.
        platform.turn_off_lvds();
        platform.turn_off_lvds();
        platform.turn_on_lvds();
        assert_eq!(platform.brightness(), RESTORE_BRIGHTNESS);
    }

    #[test]
    fn sci_event_range() {
        assert_eq!(SciEvent::from_number(0x1f), None);
        assert_eq!(SciEvent::from_number(0x20), Some(SciEvent::Ac));
        assert_eq!(SciEvent::from_number(0x2b), Some(SciEvent::PowerButton));
        assert_eq!(SciEvent::from_number(0x2c), None);

        let mut platform = laptop();
        let mut sink = RecordingSciSink::default();
        assert!(!platform.handle_sci_event(0x40, &mut sink));
        assert!(sink.reports.is_empty());
    }

    #[test]
    fn sci_hotkeys_and_lid() {
        let mut platform = laptop();
        let mut sink = RecordingSciSink::default();
        assert!(platform.handle_sci_event(SciEvent::BrightnessUp as u8, &mut sink));
        assert!(platform.handle_sci_event(SciEvent::Wlan as u8, &mut sink));
        assert!(platform.handle_sci_event(SciEvent::Lid as u8, &mut sink));
        platform.ec().set(EcReg::PowerStatus, PowerStatus::LID_OPEN.bits());
        assert!(platform.handle_sci_event(SciEvent::Lid as u8, &mut sink));
        assert_eq!(
            sink.reports,
            vec![
                SciReport::Key(KeyCode::BrightnessUp),
                SciReport::Key(KeyCode::Wlan),
                SciReport::Lid { closed: true },
                SciReport::Lid { closed: false },
            ]
        );
    }

    #[test]
    fn sci_power_events() {
        let mut platform = laptop();
        let mut sink = RecordingSciSink {
            cpu_temp: 61_500,
            ..RecordingSciSink::default()
        };
        platform
            .ec()
            .set(EcReg::PowerStatus, PowerStatus::AC_PRESENT.bits());
        platform.handle_sci_event(SciEvent::Battery as u8, &mut sink);
        assert_eq!(platform.power_info().design_capacity, 0);
        assert_eq!(platform.power_info().serial_number, SerialNumber(None));
        platform.handle_sci_event(SciEvent::Ac as u8, &mut sink);
        platform.handle_sci_event(SciEvent::CpuTemp as u8, &mut sink);
        assert_eq!(platform.ec().writes.last(), Some(&(EcReg::CpuTemp, 61)));
        assert_eq!(
            sink.reports,
            vec![
                SciReport::PowerSupplyChanged(PowerSupply::Battery),
                SciReport::PowerSupplyChanged(PowerSupply::Ac),
            ]
        );
    }
}
