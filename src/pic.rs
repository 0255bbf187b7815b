// Copyright 2026 The loongson-intc Authors.
// This project is dual-licensed under Apache 2.0 and MIT terms.
// See LICENSE-APACHE and LICENSE-MIT for details.

//! Driver for the Loongson-2K peripheral interrupt controller, and dispatch of the CPU interrupt
//! lines it feeds.
//!
//! The controller collects 64 peripheral lines and delivers them to a selectable set of cores on
//! a selectable CPU interrupt line. All lines are delivered on IP3, and their hardware numbers in
//! the interrupt domain start at [`IrqLayout::PIC_HWIRQ_BASE`].

mod registers;

pub use self::registers::{PicBank, PicRegisters, Route};
use crate::{
    CpuMask, IrqType,
    domain::{DomainError, IrqSink, LegacyDomain, ParentDomain, xlate},
};
use bitflags::bitflags;
use core::sync::atomic::{AtomicUsize, Ordering};
use log::{debug, error, trace, warn};
use safe_mmio::{UniqueMmioPointer, field};
use spin::Mutex;
use thiserror::Error;

/// The number of peripheral lines.
pub const LINE_COUNT: u32 = 64;

/// Errors from the peripheral interrupt controller.
#[derive(Copy, Clone, Debug, Eq, Error, PartialEq)]
pub enum PicError {
    /// The peripheral line number is out of range.
    #[error("PIC line {0} is out of range")]
    InvalidLine(u32),
    /// The CPU interrupt line cannot be selected by a route register.
    #[error("CPU interrupt line {0} is out of range")]
    InvalidCpuLine(u8),
    /// None of the requested cores is online and routable.
    #[error("No online routable core in {0:?}")]
    NoOnlineCpu(CpuMask),
    /// The controller cannot detect the requested trigger type.
    #[error("Trigger type {0:?} is not supported")]
    UnsupportedTrigger(IrqType),
    #[error(transparent)]
    Domain(#[from] DomainError),
}

bitflags! {
    /// Interrupt pending and mask bits of the CP0 Cause and Status registers.
    #[repr(transparent)]
    #[derive(Copy, Clone, Debug, Eq, PartialEq)]
    pub struct CauseIp: u32 {
        const IP0 = 1 << 8;
        const IP1 = 1 << 9;
        const IP2 = 1 << 10;
        const IP3 = 1 << 11;
        const IP4 = 1 << 12;
        const IP5 = 1 << 13;
        const IP6 = 1 << 14;
        const IP7 = 1 << 15;
    }
}

impl CauseIp {
    /// The interrupt mask field of CP0 Status.
    pub const ST0_IM: u32 = 0xff00;

    /// The lines the platform handles: the south bridge cascade on IP2, the peripheral
    /// controller on IP3 and inter-processor interrupts on IP6.
    pub const PLATFORM: Self = Self::IP2.union(Self::IP3).union(Self::IP6);
}

/// Driver for the Loongson-2K interrupt controller registers.
///
/// Lines are numbered 0 to 63, as wired on the chip.
pub struct Ls2kPic<'a> {
    regs: UniqueMmioPointer<'a, PicRegisters>,
}

impl<'a> Ls2kPic<'a> {
    /// Constructs a new instance of the driver for the controller with the given registers.
    pub fn new(regs: UniqueMmioPointer<'a, PicRegisters>) -> Self {
        Self { regs }
    }

    fn bank(&mut self, line: u32) -> Result<UniqueMmioPointer<'_, PicBank>, PicError> {
        if line >= LINE_COUNT {
            error!("PIC line {line} is out of range");
            return Err(PicError::InvalidLine(line));
        }
        Ok(if line < 32 {
            field!(self.regs, lo)
        } else {
            field!(self.regs, hi)
        })
    }

    /// Routes the line to the given cores on CPU interrupt line `cpu_line`.
    ///
    /// Automatic rotation is always turned off. When more than one core is selected the line
    /// bounces between them, otherwise it is delivered to the single core.
    pub fn set_route(&mut self, line: u32, cores: CpuMask, cpu_line: u8) -> Result<(), PicError> {
        if cpu_line >= Route::CPU_LINES {
            return Err(PicError::InvalidCpuLine(cpu_line));
        }
        let bit = 1 << (line % 32);
        let mut bank = self.bank(line)?;

        field!(bank, route)
            .get((line % 32) as usize)
            .ok_or(PicError::InvalidLine(line))?
            .write(Route::new(cores, cpu_line));

        {
            let mut auto = field!(bank, auto);
            let value = auto.read();
            auto.write(value & !bit);
        }

        let mut bounce = field!(bank, bounce);
        let value = bounce.read();
        if cores.weight() > 1 {
            bounce.write(value | bit);
        } else {
            bounce.write(value & !bit);
        }
        Ok(())
    }

    /// Returns the current route of the line.
    pub fn route(&mut self, line: u32) -> Result<Route, PicError> {
        let mut bank = self.bank(line)?;
        let route = field!(bank, route)
            .get((line % 32) as usize)
            .ok_or(PicError::InvalidLine(line))?
            .read();
        Ok(route)
    }

    /// Disables the line.
    pub fn mask(&mut self, line: u32) -> Result<(), PicError> {
        let mut bank = self.bank(line)?;
        field!(bank, enclr).write(1 << (line % 32));
        Ok(())
    }

    /// Enables the line.
    pub fn unmask(&mut self, line: u32) -> Result<(), PicError> {
        let mut bank = self.bank(line)?;
        field!(bank, enset).write(1 << (line % 32));
        Ok(())
    }

    /// Returns whether the line is enabled.
    pub fn is_enabled(&mut self, line: u32) -> Result<bool, PicError> {
        let mut bank = self.bank(line)?;
        Ok(field!(bank, en).read() & (1 << (line % 32)) != 0)
    }

    /// Disables all lines.
    pub fn disable_all(&mut self) {
        {
            let mut lo = field!(self.regs, lo);
            field!(lo, enclr).write(0xffff_ffff);
        }
        let mut hi = field!(self.regs, hi);
        field!(hi, enclr).write(0xffff_ffff);
    }

    /// Returns the lines which are both raised and enabled, bit `n` for line `n`.
    pub fn pending(&mut self) -> u64 {
        let (status_lo, enabled_lo) = {
            let mut lo = field!(self.regs, lo);
            let status = field!(lo, isr).read();
            let enabled = field!(lo, en).read();
            (status, enabled)
        };
        let (status_hi, enabled_hi) = {
            let mut hi = field!(self.regs, hi);
            let status = field!(hi, isr).read();
            let enabled = field!(hi, en).read();
            (status, enabled)
        };

        let status = (u64::from(status_hi) << 32) | u64::from(status_lo);
        let enabled = (u64::from(enabled_hi) << 32) | u64::from(enabled_lo);
        status & enabled
    }

    /// Configures the polarity and edge detection of the line.
    ///
    /// `IrqType::NONE` keeps the current configuration. The controller detects a single edge, so
    /// `IrqType::EDGE_BOTH` is rejected.
    pub fn set_trigger(&mut self, line: u32, irq_type: IrqType) -> Result<(), PicError> {
        let (edge, low) = if irq_type.is_empty() {
            return Ok(());
        } else if irq_type == IrqType::LEVEL_HIGH {
            (false, false)
        } else if irq_type == IrqType::LEVEL_LOW {
            (false, true)
        } else if irq_type == IrqType::EDGE_RISING {
            (true, false)
        } else if irq_type == IrqType::EDGE_FALLING {
            (true, true)
        } else {
            return Err(PicError::UnsupportedTrigger(irq_type));
        };
        let bit = 1 << (line % 32);
        let mut bank = self.bank(line)?;

        {
            let mut pol = field!(bank, pol);
            let value = pol.read();
            pol.write(if low { value | bit } else { value & !bit });
        }

        let mut edge_reg = field!(bank, edge);
        let value = edge_reg.read();
        edge_reg.write(if edge { value | bit } else { value & !bit });
        Ok(())
    }
}

/// Interrupt numbering of a Loongson-2K system.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct IrqLayout {
    /// The virtual interrupt number of CPU interrupt line IP0.
    pub cpu_irq_base: u32,
    /// The virtual interrupt number of peripheral line 0.
    pub pic_irq_base: u32,
    /// The CPU interrupt line peripheral interrupts are delivered on, counted from IP2.
    pub pic_cpu_line: u8,
}

impl IrqLayout {
    /// The hardware interrupt number of peripheral line 0 in the controller's domain.
    pub const PIC_HWIRQ_BASE: u32 = 8;

    /// Returns the domain translating the controller's hardware interrupts.
    pub const fn domain(&self) -> LegacyDomain {
        LegacyDomain::new(self.pic_irq_base, Self::PIC_HWIRQ_BASE, LINE_COUNT)
    }

    /// Returns the virtual interrupt number of the given peripheral line.
    pub fn pic_virq(&self, line: u32) -> Option<u32> {
        self.domain().revmap(line.checked_add(Self::PIC_HWIRQ_BASE)?)
    }

    /// Returns the virtual interrupt number of the given CPU interrupt line.
    pub const fn cpu_virq(&self, ip: u32) -> u32 {
        self.cpu_irq_base + ip
    }
}

impl Default for IrqLayout {
    fn default() -> Self {
        Self {
            cpu_irq_base: 56,
            pic_irq_base: 64,
            pic_cpu_line: 1,
        }
    }
}

/// The Loongson-2K interrupt hierarchy below the CPU: the peripheral controller, its domain, and
/// dispatch of the CPU interrupt lines.
///
/// All methods take `&self`. Register accesses are serialised by an internal lock, which is
/// never held while handlers run.
pub struct Ls2kIrq<'a> {
    pic: Mutex<Ls2kPic<'a>>,
    layout: IrqLayout,
    domain: LegacyDomain,
    affinity: Mutex<[CpuMask; LINE_COUNT as usize]>,
    dispatched: AtomicUsize,
}

impl<'a> Ls2kIrq<'a> {
    /// Name of the interrupt chip.
    pub const NAME: &'static str = "ls2k-pic";

    /// Creates the interrupt hierarchy for the given controller.
    pub fn new(pic: Ls2kPic<'a>, layout: IrqLayout) -> Self {
        Self {
            pic: Mutex::new(pic),
            layout,
            domain: layout.domain(),
            affinity: Mutex::new([CpuMask::single(0); LINE_COUNT as usize]),
            dispatched: AtomicUsize::new(0),
        }
    }

    /// Returns the interrupt numbering.
    pub fn layout(&self) -> &IrqLayout {
        &self.layout
    }

    /// Returns the domain of the peripheral controller.
    pub fn domain(&self) -> &LegacyDomain {
        &self.domain
    }

    /// Disables every peripheral line and routes them all to core 0.
    ///
    /// Returns the CP0 Status interrupt mask bits the caller must set for dispatch to work.
    pub fn init(&self) -> Result<CauseIp, PicError> {
        let mut pic = self.pic.lock();
        pic.disable_all();
        for line in 0..LINE_COUNT {
            pic.set_route(line, CpuMask::single(0), self.layout.pic_cpu_line)?;
        }
        *self.affinity.lock() = [CpuMask::single(0); LINE_COUNT as usize];
        debug!("{}: {} lines routed to core 0", Self::NAME, LINE_COUNT);
        Ok(CauseIp::PLATFORM)
    }

    /// Decodes an interrupt specifier for this controller.
    pub fn xlate(&self, intspec: &[u32]) -> Result<(u32, IrqType), PicError> {
        Ok(xlate(intspec)?)
    }

    fn line(&self, virq: u32) -> Result<u32, PicError> {
        let hwirq = self
            .domain
            .hwirq(virq)
            .ok_or(DomainError::NotMapped(virq))?;
        Ok(hwirq - IrqLayout::PIC_HWIRQ_BASE)
    }

    /// Disables the interrupt.
    pub fn mask(&self, virq: u32) -> Result<(), PicError> {
        let line = self.line(virq)?;
        self.pic.lock().mask(line)
    }

    /// Enables the interrupt.
    pub fn unmask(&self, virq: u32) -> Result<(), PicError> {
        let line = self.line(virq)?;
        self.pic.lock().unmask(line)
    }

    /// Sets the trigger type of the interrupt.
    pub fn set_type(&self, virq: u32, irq_type: IrqType) -> Result<(), PicError> {
        let line = self.line(virq)?;
        self.pic.lock().set_trigger(line, irq_type)
    }

    /// Routes the interrupt to the cores in `affinity` which are also in `online`.
    ///
    /// Returns the cores the interrupt is now delivered to.
    pub fn set_affinity(
        &self,
        virq: u32,
        affinity: CpuMask,
        online: CpuMask,
    ) -> Result<CpuMask, PicError> {
        let line = self.line(virq)?;
        let effective = affinity.and(online).and(Route::ROUTABLE_CORES);
        if effective.is_empty() {
            return Err(PicError::NoOnlineCpu(affinity));
        }

        self.pic
            .lock()
            .set_route(line, effective, self.layout.pic_cpu_line)?;
        self.affinity.lock()[line as usize] = effective;
        debug!("{}: virq {virq} routed to {effective:?}", Self::NAME);
        Ok(effective)
    }

    /// Returns the cores the interrupt is delivered to.
    pub fn effective_affinity(&self, virq: u32) -> Result<CpuMask, PicError> {
        let line = self.line(virq)?;
        Ok(self.affinity.lock()[line as usize])
    }

    /// Handles the peripheral controller's CPU interrupt line.
    ///
    /// Every pending line is handled, highest numbered first.
    pub fn handle_pic(&self, sink: &mut impl IrqSink) {
        let mut pending = self.pic.lock().pending();
        if pending == 0 {
            warn!("{}: spurious interrupt", Self::NAME);
            sink.spurious();
        }

        while pending != 0 {
            let line = 63 - pending.leading_zeros();
            if let Some(virq) = self.domain.revmap(line + IrqLayout::PIC_HWIRQ_BASE) {
                trace!("{}: line {line} -> virq {virq}", Self::NAME);
                sink.handle_irq(virq);
            }
            pending &= !(1 << line);
        }
    }

    /// Handles the given pending CPU interrupt lines.
    pub fn dispatch(&self, pending: CauseIp, sink: &mut impl IrqSink) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);

        if pending.contains(CauseIp::IP2) {
            sink.handle_irq(self.layout.cpu_virq(2));
        }
        if pending.contains(CauseIp::IP3) {
            self.handle_pic(sink);
        }
        if pending.contains(CauseIp::IP6) {
            sink.ipi();
        }
        if pending.contains(CauseIp::IP7) {
            sink.handle_irq(self.layout.cpu_virq(7));
        }
    }

    /// Handles an interrupt exception, given the values of the CP0 Cause and Status registers.
    pub fn plat_irq_dispatch(&self, cause: u32, status: u32, sink: &mut impl IrqSink) {
        let pending = CauseIp::from_bits_truncate(cause & status & CauseIp::ST0_IM);
        self.dispatch(pending, sink);
    }

    /// Returns the number of interrupt exceptions dispatched.
    pub fn irq_count(&self) -> usize {
        self.dispatched.load(Ordering::Relaxed)
    }
}

/// The peripheral controller as the parent of a hierarchical domain.
///
/// The controller's domain is fixed, so allocation only checks that the requested pair matches
/// the existing mapping.
impl ParentDomain for &Ls2kIrq<'_> {
    fn alloc(&mut self, virq: u32, hwirq: u32) -> Result<(), DomainError> {
        match self.domain.revmap(hwirq) {
            Some(mapped) if mapped == virq => Ok(()),
            Some(_) => Err(DomainError::Conflict { virq, hwirq }),
            None => Err(DomainError::InvalidHwIrq(hwirq)),
        }
    }

    fn free(&mut self, virq: u32, nr_irqs: u32) {
        for virq in virq..virq + nr_irqs {
            if let Err(e) = Ls2kIrq::mask(self, virq) {
                warn!("{}: failed to mask freed virq {virq}: {e}", Ls2kIrq::NAME);
            }
        }
    }

    fn mask(&mut self, virq: u32) {
        if let Err(e) = Ls2kIrq::mask(self, virq) {
            error!("{}: mask virq {virq}: {e}", Ls2kIrq::NAME);
        }
    }

    fn unmask(&mut self, virq: u32) {
        if let Err(e) = Ls2kIrq::unmask(self, virq) {
            error!("{}: unmask virq {virq}: {e}", Ls2kIrq::NAME);
        }
    }

    fn ack(&mut self, _virq: u32) {}

    fn set_affinity(&mut self, virq: u32, affinity: CpuMask) -> Result<CpuMask, DomainError> {
        Ls2kIrq::set_affinity(self, virq, affinity, Route::ROUTABLE_CORES).map_err(|e| match e {
            PicError::Domain(e) => e,
            _ => DomainError::Rejected(virq),
        })
    }
}
