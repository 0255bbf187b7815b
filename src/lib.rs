// Copyright 2026 The loongson-intc Authors.
// This project is dual-licensed under Apache 2.0 and MIT terms.
// See LICENSE-APACHE and LICENSE-MIT for details.

//! Drivers for the interrupt hardware of Loongson MIPS platforms.
//!
//! The core of the crate is the interrupt hierarchy of the Loongson-2K: CPU interrupt lines on
//! CP0, the peripheral interrupt controller ([`pic`]) multiplexed onto IP3, and PCI MSI vectors
//! handed out by the platform controller hub allocator ([`msi`]). The [`gpio`] and [`ec`] modules
//! cover the GPIO controllers and the laptop embedded controller found on the same boards.
//!
//! # Example
//!
//! Bringing up the peripheral interrupt controller and dispatching from the exception vector:
//!
//! ```no_run
//! use core::ptr::NonNull;
//! use loongson_intc::{
//!     domain::IrqSink,
//!     pic::{IrqLayout, Ls2kIrq, Ls2kPic, PicRegisters},
//!     CpuMask,
//! };
//! use safe_mmio::UniqueMmioPointer;
//!
//! struct Kernel;
//!
//! impl IrqSink for Kernel {
//!     fn handle_irq(&mut self, _virq: u32) {
//!         // Run the handlers registered for the interrupt.
//!     }
//!
//!     fn spurious(&mut self) {}
//! }
//!
//! // Uncached mapping of the ICU registers.
//! const ICU_BASE: *mut PicRegisters = 0x1fe1_1400 as _;
//!
//! // SAFETY: The ICU registers are mapped at `ICU_BASE` and nothing else accesses them.
//! let regs = unsafe { UniqueMmioPointer::new(NonNull::new(ICU_BASE).unwrap()) };
//! let irq = Ls2kIrq::new(Ls2kPic::new(regs), IrqLayout::default());
//! irq.init().unwrap();
//!
//! // Send the UART on line 8 to cores 0 and 1.
//! let virq = irq.layout().pic_virq(8).unwrap();
//! irq.set_affinity(virq, CpuMask::from_bits(0b11), CpuMask::from_bits(0b11)).unwrap();
//! irq.unmask(virq).unwrap();
//!
//! // From the exception handler, with the values of CP0 Cause and Status.
//! # let (cause, status) = (0, 0);
//! irq.plat_irq_dispatch(cause, status, &mut Kernel);
//! ```

#![cfg_attr(not(any(test, feature = "fakes")), no_std)]
#![deny(clippy::undocumented_unsafe_blocks)]

pub mod domain;
pub mod ec;
#[cfg(any(test, feature = "fakes"))]
pub mod fake;
pub mod gpio;
pub mod msi;
pub mod pic;

use bitflags::bitflags;
use core::fmt::{self, Debug, Formatter};

/// A set of CPU cores, one bit per core.
#[derive(Copy, Clone, Default, Eq, Hash, PartialEq)]
pub struct CpuMask(u64);

impl CpuMask {
    /// The maximum number of cores a mask can describe.
    pub const MAX_CPUS: u32 = 64;

    /// Returns a mask with no cores set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Returns a mask containing only the given core.
    pub const fn single(cpu: u32) -> Self {
        assert!(cpu < Self::MAX_CPUS);
        Self(1 << cpu)
    }

    /// Returns a mask from its raw bits, where bit `n` stands for core `n`.
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Returns the raw bits of the mask.
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Returns the number of cores in the mask.
    pub const fn weight(self) -> u32 {
        self.0.count_ones()
    }

    /// Returns whether no cores are set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns whether the given core is in the mask.
    pub const fn contains(self, cpu: u32) -> bool {
        cpu < Self::MAX_CPUS && self.0 & (1 << cpu) != 0
    }

    /// Returns the cores present in both masks.
    pub const fn and(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    /// Returns the lowest numbered core in the mask.
    pub const fn first(self) -> Option<u32> {
        if self.0 == 0 {
            None
        } else {
            Some(self.0.trailing_zeros())
        }
    }
}

impl Debug for CpuMask {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "CpuMask({:#x})", self.0)
    }
}

bitflags! {
    /// Interrupt sense configuration, using the same encoding as firmware interrupt specifiers.
    #[repr(transparent)]
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
    pub struct IrqType: u32 {
        const EDGE_RISING = 1 << 0;
        const EDGE_FALLING = 1 << 1;
        const EDGE_BOTH = Self::EDGE_RISING.bits() | Self::EDGE_FALLING.bits();
        const LEVEL_HIGH = 1 << 2;
        const LEVEL_LOW = 1 << 3;
    }
}

impl IrqType {
    /// No sense specified, the hardware default is kept.
    pub const NONE: Self = Self::empty();

    /// The bits of a specifier cell which carry sense information.
    pub const SENSE_MASK: u32 = 0xf;

    /// Extracts the sense bits from a raw specifier cell, dropping everything else.
    pub const fn from_spec(cell: u32) -> Self {
        Self::from_bits_truncate(cell & Self::SENSE_MASK)
    }

    /// Returns whether this is an edge triggered type.
    pub fn is_edge(self) -> bool {
        self.intersects(Self::EDGE_BOTH)
    }

    /// Returns whether this is a level triggered type.
    pub fn is_level(self) -> bool {
        self.intersects(Self::LEVEL_HIGH | Self::LEVEL_LOW)
    }

    /// Returns the trigger mode, or `None` if no sense is specified.
    pub fn trigger(self) -> Option<Trigger> {
        if self.is_edge() {
            Some(Trigger::Edge)
        } else if self.is_level() {
            Some(Trigger::Level)
        } else {
            None
        }
    }
}

/// The trigger configuration for an interrupt.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Trigger {
    /// The interrupt is edge triggered.
    Edge,
    /// The interrupt is level triggered.
    Level,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpumask_weight_and_intersection() {
        let mask = CpuMask::from_bits(0b1011);
        assert_eq!(mask.weight(), 3);
        assert!(mask.contains(3));
        assert!(!mask.contains(2));
        assert!(!mask.contains(64));
        assert_eq!(mask.and(CpuMask::from_bits(0b0110)), CpuMask::single(1));
        assert_eq!(mask.first(), Some(0));
        assert_eq!(CpuMask::empty().first(), None);
    }

    #[test]
    fn irq_type_from_spec() {
        assert_eq!(IrqType::from_spec(0x104), IrqType::LEVEL_HIGH);
        assert_eq!(IrqType::from_spec(3), IrqType::EDGE_BOTH);
        assert_eq!(IrqType::from_spec(0), IrqType::NONE);
        assert_eq!(IrqType::LEVEL_LOW.trigger(), Some(Trigger::Level));
        assert_eq!(IrqType::EDGE_FALLING.trigger(), Some(Trigger::Edge));
        assert_eq!(IrqType::NONE.trigger(), None);
    }
}
