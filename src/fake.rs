// Copyright 2026 The loongson-intc Authors.
// This project is dual-licensed under Apache 2.0 and MIT terms.
// See LICENSE-APACHE and LICENSE-MIT for details.

//! Fake implementations of the traits the drivers call out through, for tests.

use crate::{
    CpuMask,
    domain::{DomainError, IrqSink, ParentDomain},
    ec::{Ec, EcReg, KeyCode, PowerSupply, SciSink},
    msi::MsiDescriptor,
};
use std::collections::{BTreeMap, BTreeSet};

/// Something an [`IrqSink`] was asked to do.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SinkEvent {
    Irq(u32),
    Spurious,
    Ipi,
}

/// An [`IrqSink`] which records what it was asked to do.
#[derive(Clone, Debug, Default)]
pub struct RecordingSink {
    pub events: Vec<SinkEvent>,
}

impl IrqSink for RecordingSink {
    fn handle_irq(&mut self, virq: u32) {
        self.events.push(SinkEvent::Irq(virq));
    }

    fn spurious(&mut self) {
        self.events.push(SinkEvent::Spurious);
    }

    fn ipi(&mut self) {
        self.events.push(SinkEvent::Ipi);
    }
}

/// A call made on a [`FakeParent`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ParentCall {
    Alloc(u32, u32),
    Free(u32, u32),
    Mask(u32),
    Unmask(u32),
    Ack(u32),
    SetAffinity(u32, CpuMask),
}

/// A parent domain which accepts any mapping, except for one virtual interrupt it can be told to
/// reject.
#[derive(Clone, Debug, Default)]
pub struct FakeParent {
    /// Virtual interrupts currently allocated, with their hardware interrupts.
    pub allocated: BTreeMap<u32, u32>,
    pub masked: BTreeSet<u32>,
    pub calls: Vec<ParentCall>,
    /// Allocating this virtual interrupt fails.
    pub fail_virq: Option<u32>,
}

impl ParentDomain for FakeParent {
    fn alloc(&mut self, virq: u32, hwirq: u32) -> Result<(), DomainError> {
        self.calls.push(ParentCall::Alloc(virq, hwirq));
        if self.fail_virq == Some(virq) {
            return Err(DomainError::Rejected(virq));
        }
        self.allocated.insert(virq, hwirq);
        Ok(())
    }

    fn free(&mut self, virq: u32, nr_irqs: u32) {
        self.calls.push(ParentCall::Free(virq, nr_irqs));
        for virq in virq..virq + nr_irqs {
            self.allocated.remove(&virq);
        }
    }

    fn mask(&mut self, virq: u32) {
        self.calls.push(ParentCall::Mask(virq));
        self.masked.insert(virq);
    }

    fn unmask(&mut self, virq: u32) {
        self.calls.push(ParentCall::Unmask(virq));
        self.masked.remove(&virq);
    }

    fn ack(&mut self, virq: u32) {
        self.calls.push(ParentCall::Ack(virq));
    }

    fn set_affinity(&mut self, virq: u32, affinity: CpuMask) -> Result<CpuMask, DomainError> {
        self.calls.push(ParentCall::SetAffinity(virq, affinity));
        Ok(affinity)
    }
}

/// Per-device MSI mask state.
#[derive(Clone, Debug, Default)]
pub struct FakeMsiDescriptor {
    pub masked: bool,
}

impl MsiDescriptor for FakeMsiDescriptor {
    fn mask(&mut self) {
        self.masked = true;
    }

    fn unmask(&mut self) {
        self.masked = false;
    }
}

/// An embedded controller backed by a map of register values.
///
/// Registers never written read as zero. Every write is also logged in order.
#[derive(Clone, Debug, Default)]
pub struct FakeEc {
    pub regs: BTreeMap<EcReg, u8>,
    pub writes: Vec<(EcReg, u8)>,
}

impl FakeEc {
    /// Sets a register without logging a write.
    pub fn set(&mut self, reg: EcReg, value: u8) {
        self.regs.insert(reg, value);
    }

    /// Sets the two registers of a 16-bit little-endian value.
    pub fn set_word(&mut self, lo: EcReg, hi: EcReg, value: u16) {
        let [low, high] = value.to_le_bytes();
        self.set(lo, low);
        self.set(hi, high);
    }
}

impl Ec for FakeEc {
    fn read(&mut self, reg: EcReg) -> u8 {
        self.regs.get(&reg).copied().unwrap_or(0)
    }

    fn write(&mut self, reg: EcReg, value: u8) {
        self.regs.insert(reg, value);
        self.writes.push((reg, value));
    }
}

/// Something a [`SciSink`] was asked to report.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SciReport {
    Key(KeyCode),
    Lid { closed: bool },
    PowerSupplyChanged(PowerSupply),
}

/// A [`SciSink`] which records what it was asked to report.
#[derive(Clone, Debug, Default)]
pub struct RecordingSciSink {
    pub reports: Vec<SciReport>,
    /// Value returned as the CPU temperature, in millidegrees Celsius.
    pub cpu_temp: i32,
}

impl SciSink for RecordingSciSink {
    fn key(&mut self, key: KeyCode) {
        self.reports.push(SciReport::Key(key));
    }

    fn lid(&mut self, closed: bool) {
        self.reports.push(SciReport::Lid { closed });
    }

    fn power_supply_changed(&mut self, supply: PowerSupply) {
        self.reports.push(SciReport::PowerSupplyChanged(supply));
    }

    fn cpu_temp(&mut self) -> i32 {
        self.cpu_temp
    }
}
