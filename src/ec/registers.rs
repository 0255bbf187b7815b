// Copyright 2026 The loongson-intc Authors.
// This project is dual-licensed under Apache 2.0 and MIT terms.
// See LICENSE-APACHE and LICENSE-MIT for details.

use bitflags::bitflags;

/// Embedded controller registers used by the platform driver.
///
/// The index of each register in the controller's address space is a matter for the [`Ec`]
/// implementation.
///
/// [`Ec`]: super::Ec
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum EcReg {
    /// Power and lid status, see [`PowerStatus`].
    PowerStatus,
    /// Wireless and other device status.
    DeviceStatus,
    /// CPU temperature reported to the controller, in degrees Celsius.
    CpuTemp,
    /// Panel backlight level, 0 to 100, or 255 while the panel is off.
    DisplayBrightness,
    /// Battery relative state of charge, in percent.
    BatteryCapacity,
    BatteryTempLow,
    BatteryTempHigh,
    BatteryVoltageLow,
    BatteryVoltageHigh,
    BatteryCurrentLow,
    BatteryCurrentHigh,
    BatteryAvgCurrentLow,
    BatteryAvgCurrentHigh,
    BatteryRemainingCapacityLow,
    BatteryRemainingCapacityHigh,
    BatteryFullChargeCapacityLow,
    BatteryFullChargeCapacityHigh,
    BatteryTimeToEmptyLow,
    BatteryTimeToEmptyHigh,
    BatteryTimeToFullLow,
    BatteryTimeToFullHigh,
    BatteryCycleCountLow,
    BatteryCycleCountHigh,
    BatterySerialLow,
    BatterySerialHigh,
    BatteryCellVoltageLow,
    BatteryCellVoltageHigh,
    BatteryDesignCapacityLow,
    BatteryDesignCapacityHigh,
    BatteryDesignVoltageLow,
    BatteryDesignVoltageHigh,
}

/// A 16-bit value held in a pair of embedded controller registers.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EcWord {
    /// Battery temperature, in tenths of a kelvin.
    BatteryTemp,
    /// Battery voltage, in mV.
    BatteryVoltage,
    /// Battery current, in mA, negative while discharging.
    BatteryCurrent,
    /// Average battery current, in mA.
    BatteryAvgCurrent,
    /// Remaining capacity, in mAh.
    RemainingCapacity,
    /// Capacity when fully charged, in mAh.
    FullChargeCapacity,
    /// Average time to empty, in minutes, or 0xffff.
    TimeToEmpty,
    /// Average time to full, in minutes, or 0xffff.
    TimeToFull,
    CycleCount,
    SerialNumber,
    /// Total cell voltage, in mV.
    CellVoltage,
    /// Design capacity, in mAh.
    DesignCapacity,
    /// Design voltage, in mV.
    DesignVoltage,
}

impl EcWord {
    /// Returns the registers holding the low and high bytes.
    pub const fn regs(self) -> (EcReg, EcReg) {
        match self {
            Self::BatteryTemp => (EcReg::BatteryTempLow, EcReg::BatteryTempHigh),
            Self::BatteryVoltage => (EcReg::BatteryVoltageLow, EcReg::BatteryVoltageHigh),
            Self::BatteryCurrent => (EcReg::BatteryCurrentLow, EcReg::BatteryCurrentHigh),
            Self::BatteryAvgCurrent => (EcReg::BatteryAvgCurrentLow, EcReg::BatteryAvgCurrentHigh),
            Self::RemainingCapacity => (
                EcReg::BatteryRemainingCapacityLow,
                EcReg::BatteryRemainingCapacityHigh,
            ),
            Self::FullChargeCapacity => (
                EcReg::BatteryFullChargeCapacityLow,
                EcReg::BatteryFullChargeCapacityHigh,
            ),
            Self::TimeToEmpty => (EcReg::BatteryTimeToEmptyLow, EcReg::BatteryTimeToEmptyHigh),
            Self::TimeToFull => (EcReg::BatteryTimeToFullLow, EcReg::BatteryTimeToFullHigh),
            Self::CycleCount => (EcReg::BatteryCycleCountLow, EcReg::BatteryCycleCountHigh),
            Self::SerialNumber => (EcReg::BatterySerialLow, EcReg::BatterySerialHigh),
            Self::CellVoltage => (EcReg::BatteryCellVoltageLow, EcReg::BatteryCellVoltageHigh),
            Self::DesignCapacity => (
                EcReg::BatteryDesignCapacityLow,
                EcReg::BatteryDesignCapacityHigh,
            ),
            Self::DesignVoltage => (
                EcReg::BatteryDesignVoltageLow,
                EcReg::BatteryDesignVoltageHigh,
            ),
        }
    }
}

bitflags! {
    /// Value of the [`EcReg::PowerStatus`] register.
    #[repr(transparent)]
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
    pub struct PowerStatus: u8 {
        const BAT_PRESENT = 1 << 0;
        const AC_PRESENT = 1 << 1;
        const BAT_CHARGING = 1 << 2;
        const BAT_FULL = 1 << 3;
        const LID_OPEN = 1 << 5;
    }
}
