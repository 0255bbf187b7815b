// Copyright 2026 The loongson-intc Authors.
// This project is dual-licensed under Apache 2.0 and MIT terms.
// See LICENSE-APACHE and LICENSE-MIT for details.

//! Interrupt number translation between domains, and the traits joining the levels of the
//! interrupt hierarchy.
//!
//! Each level of the hierarchy has its own hardware interrupt numbers (`hwirq`). Software refers
//! to interrupts by a virtual number (`virq`), and each domain translates between the two.

use crate::{CpuMask, IrqType};
use thiserror::Error;

/// Errors from interrupt domain operations.
#[derive(Copy, Clone, Debug, Eq, Error, PartialEq)]
pub enum DomainError {
    /// The interrupt specifier had no cells.
    #[error("Interrupt specifier is empty")]
    InvalidSpec,
    /// The virtual interrupt number is not mapped by this domain.
    #[error("Virtual IRQ {0} is not mapped by this domain")]
    NotMapped(u32),
    /// The hardware interrupt number is outside the range of this domain.
    #[error("Hardware IRQ {0} is outside this domain")]
    InvalidHwIrq(u32),
    /// The virtual interrupt is already backed by a different hardware interrupt.
    #[error("Virtual IRQ {virq} cannot be backed by hardware IRQ {hwirq}")]
    Conflict { virq: u32, hwirq: u32 },
    /// The controller rejected the request for the virtual interrupt.
    #[error("Controller rejected the request for virtual IRQ {0}")]
    Rejected(u32),
}

/// A domain mapping a contiguous range of hardware interrupts onto a contiguous range of virtual
/// interrupt numbers, fixed when the domain is created.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct LegacyDomain {
    first_virq: u32,
    first_hwirq: u32,
    size: u32,
}

impl LegacyDomain {
    /// Creates a domain mapping `size` hardware interrupts starting at `first_hwirq` onto the
    /// virtual interrupts starting at `first_virq`.
    pub const fn new(first_virq: u32, first_hwirq: u32, size: u32) -> Self {
        Self {
            first_virq,
            first_hwirq,
            size,
        }
    }

    /// Returns the number of interrupts in the domain.
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// Returns the virtual interrupt number for the given hardware interrupt.
    pub fn revmap(&self, hwirq: u32) -> Option<u32> {
        let offset = hwirq.checked_sub(self.first_hwirq)?;
        (offset < self.size).then(|| self.first_virq + offset)
    }

    /// Returns the hardware interrupt number for the given virtual interrupt.
    pub fn hwirq(&self, virq: u32) -> Option<u32> {
        let offset = virq.checked_sub(self.first_virq)?;
        (offset < self.size).then(|| self.first_hwirq + offset)
    }
}

/// Decodes a one or two cell interrupt specifier into a hardware interrupt number and sense.
///
/// The first cell is the hardware interrupt number. The optional second cell carries the sense
/// bits; anything else in it is ignored.
pub fn xlate(intspec: &[u32]) -> Result<(u32, IrqType), DomainError> {
    match intspec {
        [] => Err(DomainError::InvalidSpec),
        [hwirq] => Ok((*hwirq, IrqType::NONE)),
        [hwirq, sense, ..] => Ok((*hwirq, IrqType::from_spec(*sense))),
    }
}

/// The level above a hierarchical domain, which an interrupt allocated in the child must also be
/// allocated in.
pub trait ParentDomain {
    /// Allocates `virq` in the parent, backed by the parent's hardware interrupt `hwirq`.
    fn alloc(&mut self, virq: u32, hwirq: u32) -> Result<(), DomainError>;

    /// Releases `nr_irqs` consecutive virtual interrupts starting at `virq`.
    fn free(&mut self, virq: u32, nr_irqs: u32);

    /// Masks the interrupt in the parent.
    fn mask(&mut self, virq: u32);

    /// Unmasks the interrupt in the parent.
    fn unmask(&mut self, virq: u32);

    /// Acknowledges the interrupt in the parent.
    fn ack(&mut self, virq: u32);

    /// Routes the interrupt to the given cores, returning the cores it was actually routed to.
    fn set_affinity(&mut self, virq: u32, affinity: CpuMask) -> Result<CpuMask, DomainError>;
}

/// Receives the interrupts decoded by a dispatcher.
pub trait IrqSink {
    /// Handles the virtual interrupt `virq`.
    fn handle_irq(&mut self, virq: u32);

    /// Called when the controller raised an interrupt but nothing enabled is pending.
    fn spurious(&mut self);

    /// Handles an inter-processor interrupt.
    fn ipi(&mut self) {}
}
