// Copyright 2026 The loongson-intc Authors.
// This project is dual-licensed under Apache 2.0 and MIT terms.
// See LICENSE-APACHE and LICENSE-MIT for details.

use crate::CpuMask;
use safe_mmio::fields::{ReadPure, ReadPureWrite, WriteOnly};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Interrupt route register value.
///
/// The low nibble selects the cores the line is delivered to, and bit `4 + n` selects CPU
/// interrupt line `n` (IP2 + n).
#[derive(Clone, Copy, Debug, Default, Eq, FromBytes, Immutable, IntoBytes, KnownLayout, PartialEq)]
#[repr(transparent)]
pub struct Route(u8);

impl Route {
    /// The cores a route register can address.
    pub const ROUTABLE_CORES: CpuMask = CpuMask::from_bits(0xf);

    /// The number of CPU interrupt lines a route register can select.
    pub const CPU_LINES: u8 = 4;

    /// Returns the route delivering to the given cores on CPU interrupt line `cpu_line`.
    ///
    /// Cores beyond the first four are dropped.
    pub fn new(cores: CpuMask, cpu_line: u8) -> Self {
        assert!(cpu_line < Self::CPU_LINES);
        Self((1 << (cpu_line + 4)) | (cores.and(Self::ROUTABLE_CORES).bits() as u8))
    }

    /// Returns the cores the line is delivered to.
    pub fn cores(self) -> CpuMask {
        CpuMask::from_bits(u64::from(self.0 & 0xf))
    }

    /// Returns the lowest CPU interrupt line selected, if any.
    pub fn cpu_line(self) -> Option<u8> {
        let lines = self.0 >> 4;
        if lines == 0 {
            None
        } else {
            Some(lines.trailing_zeros() as u8)
        }
    }
}

/// One bank of the Loongson-2K interrupt controller, covering 32 lines.
#[repr(C, align(8))]
pub struct PicBank {
    /// Interrupt route registers, one byte per line.
    pub route: [ReadPureWrite<Route>; 32],
    /// Interrupt status register.
    pub isr: ReadPure<u32>,
    /// Interrupt enable status register.
    pub en: ReadPure<u32>,
    /// Interrupt set-enable register.
    pub enset: WriteOnly<u32>,
    /// Interrupt clear-enable register.
    pub enclr: WriteOnly<u32>,
    /// Interrupt polarity register.
    pub pol: ReadPureWrite<u32>,
    /// Interrupt edge configuration register.
    pub edge: ReadPureWrite<u32>,
    /// Multi-core rotation ("bounce") register.
    pub bounce: ReadPureWrite<u32>,
    /// Automatic rotation register.
    pub auto: ReadPureWrite<u32>,
}

/// Loongson-2K interrupt controller registers.
#[repr(C, align(8))]
pub struct PicRegisters {
    /// Lines 0 to 31.
    pub lo: PicBank,
    /// Lines 32 to 63.
    pub hi: PicBank,
}

#[cfg(any(test, feature = "fakes"))]
impl PicBank {
    fn fake() -> Self {
        Self {
            route: core::array::from_fn(|_| ReadPureWrite(Route::default())),
            isr: ReadPure(0),
            en: ReadPure(0),
            enset: WriteOnly(0),
            enclr: WriteOnly(0),
            pol: ReadPureWrite(0),
            edge: ReadPureWrite(0),
            bounce: ReadPureWrite(0),
            auto: ReadPureWrite(0),
        }
    }
}

#[cfg(any(test, feature = "fakes"))]
impl PicRegisters {
    /// Returns a zeroed register block in ordinary memory, for tests.
    pub fn fake() -> Self {
        Self {
            lo: PicBank::fake(),
            hi: PicBank::fake(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::mem::{offset_of, size_of};

    #[test]
    fn bank_layout() {
        assert_eq!(offset_of!(PicBank, isr), 0x20);
        assert_eq!(offset_of!(PicBank, enclr), 0x2c);
        assert_eq!(offset_of!(PicBank, auto), 0x3c);
        assert_eq!(size_of::<PicBank>(), 0x40);
        assert_eq!(offset_of!(PicRegisters, hi), 0x40);
    }

    #[test]
    fn route_encoding() {
        let route = Route::new(CpuMask::from_bits(0b10011), 1);
        assert_eq!(route, Route(0x23));
        assert_eq!(route.cores(), CpuMask::from_bits(0b0011));
        assert_eq!(route.cpu_line(), Some(1));
        assert_eq!(Route::default().cpu_line(), None);
    }
}
