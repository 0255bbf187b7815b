// Copyright 2026 The loongson-intc Authors.
// This project is dual-licensed under Apache 2.0 and MIT terms.
// See LICENSE-APACHE and LICENSE-MIT for details.

//! MSI vector allocation for the Loongson platform controller hub.
//!
//! PCI devices signal MSIs by writing a vector number to a doorbell address. The vectors are
//! hardware interrupts of a parent domain (the controller the PCH forwards to). [`PchMsi`] is the
//! domain between the two: it hands out blocks of vectors, allocates each of them in the parent,
//! and composes the message devices must write.

mod bitmap;

pub use self::bitmap::{MsiBitmap, count_order};
use crate::{
    CpuMask,
    domain::{DomainError, ParentDomain},
};
use bitflags::bitflags;
use log::{debug, error};
use spin::Mutex;
use thiserror::Error;

/// Number of MSI vectors on chips without the 256 vector extension.
pub const MSI_IRQ_NR_64: u32 = 64;
/// Number of MSI vectors on chips with 256 vectors.
pub const MSI_IRQ_NR_192: u32 = 192;
/// Number of MSI vectors available to a guest using extended routing.
pub const MSI_IRQ_NR_224: u32 = 224;

/// The first vector used for MSIs on the host.
pub const PCH_IRQ_BASE: u32 = 64;
/// The first vector used for MSIs in a guest with extended routing.
pub const GUEST_PCH_IRQ_BASE: u32 = 32;

/// Errors from the MSI domain.
#[derive(Copy, Clone, Debug, Eq, Error, PartialEq)]
pub enum MsiError {
    /// No free block of vectors is large enough.
    #[error("No free MSI vectors")]
    NoSpace,
    /// The number of vectors requested is not supported.
    #[error("Cannot allocate {0} MSI vectors")]
    InvalidCount(u32),
    /// The virtual interrupt has no MSI vector.
    #[error("Virtual IRQ {0} has no MSI vector")]
    NotMapped(u32),
    #[error(transparent)]
    Parent(#[from] DomainError),
}

/// How PCH interrupts reach the CPU.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RouteModel {
    /// Through HyperTransport interrupt vectors.
    Ht,
    /// Through the extended I/O interrupt controller.
    Ext,
    /// Through the extended I/O interrupt controller as seen by a guest.
    ExtGuest,
}

/// The doorbell address devices write MSI data to.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct MsiAddress {
    pub hi: u32,
    pub lo: u32,
}

/// A message a device writes to raise an MSI.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct MsiMsg {
    pub address_hi: u32,
    pub address_lo: u32,
    pub data: u32,
}

bitflags! {
    /// Capabilities of the MSI domain.
    #[repr(transparent)]
    #[derive(Copy, Clone, Debug, Eq, PartialEq)]
    pub struct MsiDomainFlags: u32 {
        /// Use the default domain operations where none are given.
        const USE_DEF_DOM_OPS = 1 << 0;
        /// Use the default chip operations where none are given.
        const USE_DEF_CHIP_OPS = 1 << 1;
        /// Multiple MSI vectors per device are supported.
        const MULTI_PCI_MSI = 1 << 2;
        /// MSI-X is supported.
        const PCI_MSIX = 1 << 3;
    }
}

/// Configuration of the MSI domain.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct MsiConfig {
    /// The first vector used for MSIs.
    pub irq_first: u32,
    /// The number of vectors used for MSIs.
    pub num_irqs: u32,
    /// How the vectors reach the CPU.
    pub model: RouteModel,
    /// The doorbell address.
    pub address: MsiAddress,
}

impl MsiConfig {
    /// Returns the vector range used for MSIs under the given routing model.
    pub fn new(model: RouteModel, has_msi256: bool, address: MsiAddress) -> Self {
        let (irq_first, num_irqs) = match model {
            RouteModel::ExtGuest => (GUEST_PCH_IRQ_BASE, MSI_IRQ_NR_224),
            _ if has_msi256 => (PCH_IRQ_BASE, MSI_IRQ_NR_192),
            _ => (PCH_IRQ_BASE, MSI_IRQ_NR_64),
        };
        Self {
            irq_first,
            num_irqs,
            model,
            address,
        }
    }

    /// Returns whether the vectors are delivered through the extended controller.
    pub fn is_ext(&self) -> bool {
        self.model != RouteModel::Ht
    }
}

/// Per-device MSI masking, in the device's MSI or MSI-X capability.
pub trait MsiDescriptor {
    /// Masks the vector at the device.
    fn mask(&mut self);

    /// Unmasks the vector at the device.
    fn unmask(&mut self);
}

struct MsiState {
    map: MsiBitmap,
    /// Virtual interrupt of each vector, indexed from `irq_first`.
    virqs: [Option<u32>; MsiBitmap::CAPACITY as usize],
}

/// The PCH MSI domain, between PCI devices and the parent controller.
///
/// The vector map and the parent have separate locks, and the map lock is never held while
/// calling into the parent.
pub struct PchMsi<P> {
    config: MsiConfig,
    state: Mutex<MsiState>,
    parent: Mutex<P>,
}

impl<P: ParentDomain> PchMsi<P> {
    /// Name of the middle domain's interrupt chip.
    pub const MIDDLE_NAME: &'static str = "PCH MSI";

    /// Creates the MSI domain on top of `parent`.
    pub fn new(config: MsiConfig, parent: P) -> Result<Self, MsiError> {
        if config.num_irqs == 0 || config.num_irqs > MsiBitmap::CAPACITY {
            error!("Cannot manage {} MSI vectors", config.num_irqs);
            return Err(MsiError::InvalidCount(config.num_irqs));
        }
        debug!(
            "Registering {} MSIs, starting at {}",
            config.num_irqs, config.irq_first
        );
        Ok(Self {
            config,
            state: Mutex::new(MsiState {
                map: MsiBitmap::new(config.num_irqs),
                virqs: [None; MsiBitmap::CAPACITY as usize],
            }),
            parent: Mutex::new(parent),
        })
    }

    /// Returns the configuration of the domain.
    pub fn config(&self) -> &MsiConfig {
        &self.config
    }

    /// Name of the PCI MSI interrupt chip.
    pub fn chip_name(&self) -> &'static str {
        if self.config.is_ext() {
            "PCH-MSI-EXT"
        } else {
            "PCH-MSI-HT"
        }
    }

    /// Capabilities of the PCI MSI domain.
    pub fn domain_info(&self) -> MsiDomainFlags {
        MsiDomainFlags::all()
    }

    /// Allocates a naturally aligned block of vectors large enough for `count` interrupts.
    ///
    /// Returns the first vector.
    pub fn allocate_hwirq(&self, count: u32) -> Result<u32, MsiError> {
        if count == 0 {
            return Err(MsiError::InvalidCount(count));
        }
        if count > self.config.num_irqs {
            return Err(MsiError::NoSpace);
        }
        let first = self
            .state
            .lock()
            .map
            .find_free_region(count_order(count))
            .ok_or(MsiError::NoSpace)?;
        Ok(self.config.irq_first + first)
    }

    /// Releases a block returned by [`Self::allocate_hwirq`].
    ///
    /// The virtual interrupt records of the block are cleared along with it.
    pub fn free_hwirq(&self, hwirq: u32, count: u32) {
        let Some(first) = hwirq.checked_sub(self.config.irq_first) else {
            error!("Vector {hwirq} is not an MSI vector");
            return;
        };
        let order = count_order(count);
        let mut state = self.state.lock();
        let end = first
            .saturating_add(1 << order.min(31))
            .min(self.config.num_irqs);
        state.virqs[first.min(end) as usize..end as usize].fill(None);
        state.map.release_region(first, order);
    }

    fn record_virq(&self, hwirq: u32, virq: u32) {
        let index = (hwirq - self.config.irq_first) as usize;
        self.state.lock().virqs[index] = Some(virq);
    }

    /// Allocates `nr_irqs` consecutive virtual interrupts starting at `virq`, backed by a block
    /// of vectors which are also allocated in the parent.
    ///
    /// Returns the first vector. If the parent fails, everything allocated so far is released.
    pub fn alloc(&self, virq: u32, nr_irqs: u32) -> Result<u32, MsiError> {
        let hwirq = self.allocate_hwirq(nr_irqs)?;

        for i in 0..nr_irqs {
            let result = self.parent.lock().alloc(virq + i, hwirq + i);
            if let Err(e) = result {
                error!("Parent refused vector {} for virq {}: {e}", hwirq + i, virq + i);
                if i > 0 {
                    self.parent.lock().free(virq, i);
                }
                self.free_hwirq(hwirq, nr_irqs);
                return Err(e.into());
            }
            self.record_virq(hwirq + i, virq + i);
        }
        Ok(hwirq)
    }

    /// Frees `nr_irqs` virtual interrupts starting at `virq`, and their vectors.
    pub fn free(&self, virq: u32, nr_irqs: u32) -> Result<(), MsiError> {
        let hwirq = self.hwirq(virq).ok_or(MsiError::NotMapped(virq))?;
        self.parent.lock().free(virq, nr_irqs);
        self.free_hwirq(hwirq, nr_irqs);
        Ok(())
    }

    /// Returns the vector backing the virtual interrupt.
    pub fn hwirq(&self, virq: u32) -> Option<u32> {
        let state = self.state.lock();
        state.virqs[..self.config.num_irqs as usize]
            .iter()
            .position(|&slot| slot == Some(virq))
            .map(|index| self.config.irq_first + index as u32)
    }

    /// Returns the message a device must write to raise the virtual interrupt.
    pub fn compose_msi_msg(&self, virq: u32) -> Result<MsiMsg, MsiError> {
        let hwirq = self.hwirq(virq).ok_or(MsiError::NotMapped(virq))?;
        Ok(MsiMsg {
            address_hi: self.config.address.hi,
            address_lo: self.config.address.lo,
            data: hwirq,
        })
    }

    /// Masks the interrupt in the parent.
    pub fn mask(&self, virq: u32) {
        self.parent.lock().mask(virq);
    }

    /// Unmasks the interrupt in the parent.
    pub fn unmask(&self, virq: u32) {
        self.parent.lock().unmask(virq);
    }

    /// Acknowledges the interrupt in the parent.
    pub fn ack(&self, virq: u32) {
        self.parent.lock().ack(virq);
    }

    /// Routes the interrupt through the parent.
    pub fn set_affinity(&self, virq: u32, affinity: CpuMask) -> Result<CpuMask, MsiError> {
        Ok(self.parent.lock().set_affinity(virq, affinity)?)
    }

    /// Masks the interrupt at the device, then in the parent.
    pub fn mask_msi_irq(&self, virq: u32, desc: &mut impl MsiDescriptor) {
        desc.mask();
        self.mask(virq);
    }

    /// Unmasks the interrupt in the parent, then at the device.
    pub fn unmask_msi_irq(&self, virq: u32, desc: &mut impl MsiDescriptor) {
        self.unmask(virq);
        desc.unmask();
    }

    /// Runs `f` with exclusive access to the parent domain.
    pub fn with_parent<R>(&self, f: impl FnOnce(&mut P) -> R) -> R {
        f(&mut self.parent.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{FakeMsiDescriptor, FakeParent, ParentCall};

    const ADDRESS: MsiAddress = MsiAddress {
        hi: 0,
        lo: 0x2ff0_0000,
    };

    fn ht_msi(has_msi256: bool) -> PchMsi<FakeParent> {
        PchMsi::new(
            MsiConfig::new(RouteModel::Ht, has_msi256, ADDRESS),
            FakeParent::default(),
        )
        .unwrap()
    }

    #[test]
    fn config_per_model() {
        let guest = MsiConfig::new(RouteModel::ExtGuest, true, ADDRESS);
        assert_eq!((guest.irq_first, guest.num_irqs), (32, 224));
        assert!(guest.is_ext());
        let host = MsiConfig::new(RouteModel::Ext, true, ADDRESS);
        assert_eq!((host.irq_first, host.num_irqs), (64, 192));
        let small = MsiConfig::new(RouteModel::Ht, false, ADDRESS);
        assert_eq!((small.irq_first, small.num_irqs), (64, 64));
        assert!(!small.is_ext());
    }

    #[test]
    fn chip_names() {
        assert_eq!(ht_msi(false).chip_name(), "PCH-MSI-HT");
        let ext = PchMsi::new(
            MsiConfig::new(RouteModel::Ext, true, ADDRESS),
            FakeParent::default(),
        )
        .unwrap();
        assert_eq!(ext.chip_name(), "PCH-MSI-EXT");
    }

    #[test]
    fn alloc_maps_vectors_in_parent() {
        let msi = ht_msi(true);
        assert_eq!(msi.alloc(300, 1), Ok(64));
        assert_eq!(msi.alloc(310, 3), Ok(68));
        msi.with_parent(|parent| {
            assert_eq!(parent.allocated.get(&310), Some(&68));
            assert_eq!(parent.allocated.get(&312), Some(&70));
            assert_eq!(parent.allocated.len(), 4);
        });
        assert_eq!(msi.hwirq(311), Some(69));
        assert_eq!(msi.hwirq(313), None);
        assert_eq!(
            msi.compose_msi_msg(312),
            Ok(MsiMsg {
                address_hi: 0,
                address_lo: 0x2ff0_0000,
                data: 70,
            })
        );
    }

    #[test]
    fn free_releases_block() {
        let msi = ht_msi(false);
        assert_eq!(msi.alloc(100, 4), Ok(64));
        assert_eq!(msi.free(100, 4), Ok(()));
        assert_eq!(msi.hwirq(100), None);
        assert_eq!(msi.free(100, 4), Err(MsiError::NotMapped(100)));
        msi.with_parent(|parent| {
            assert!(parent.allocated.is_empty());
            assert_eq!(parent.calls.last(), Some(&ParentCall::Free(100, 4)));
        });
        assert_eq!(msi.alloc(200, 4), Ok(64));
    }

    #[test]
    fn exhaustion() {
        let msi = ht_msi(false);
        assert_eq!(msi.alloc(0, 32), Ok(64));
        assert_eq!(msi.alloc(100, 33), Err(MsiError::NoSpace));
        assert_eq!(msi.alloc(100, 16), Ok(96));
        assert_eq!(msi.alloc(200, 16), Ok(112));
        assert_eq!(msi.alloc(300, 1), Err(MsiError::NoSpace));
        assert_eq!(msi.alloc(300, 0), Err(MsiError::InvalidCount(0)));
        assert_eq!(msi.alloc(300, 65), Err(MsiError::NoSpace));
    }

    #[test]
    fn free_releases_rounded_block() {
        let msi = ht_msi(false);
        assert_eq!(msi.alloc(100, 3), Ok(64));
        // The fourth vector of the block is reserved but not mapped.
        assert_eq!(msi.alloc(200, 1), Ok(68));
        assert_eq!(msi.free(100, 3), Ok(()));
        msi.with_parent(|parent| {
            assert_eq!(parent.allocated.len(), 1);
            assert_eq!(parent.calls.last(), Some(&ParentCall::Free(100, 3)));
        });
        assert_eq!(msi.alloc(300, 4), Ok(64));
        assert_eq!(msi.hwirq(303), Some(67));
        assert_eq!(msi.hwirq(200), Some(68));
    }

    #[test]
    fn reused_vectors_keep_their_new_mapping() {
        let msi = ht_msi(false);
        std::thread::scope(|scope| {
            for first_virq in [1000, 2000] {
                let msi = &msi;
                scope.spawn(move || {
                    for round in 0..500 {
                        let virq = first_virq + (round % 4) * 8;
                        let hwirq = msi.alloc(virq, 3).unwrap();
                        assert_eq!(msi.hwirq(virq + 2), Some(hwirq + 2));
                        assert_eq!(msi.compose_msi_msg(virq).unwrap().data, hwirq);
                        msi.free(virq, 3).unwrap();
                    }
                });
            }
        });
        assert_eq!(msi.alloc(0, 64), Ok(64));
    }

    #[test]
    fn parent_failure_unwinds() {
        let msi = PchMsi::new(
            MsiConfig::new(RouteModel::Ht, false, ADDRESS),
            FakeParent {
                fail_virq: Some(52),
                ..FakeParent::default()
            },
        )
        .unwrap();
        assert_eq!(
            msi.alloc(50, 4),
            Err(MsiError::Parent(DomainError::Rejected(52)))
        );
        msi.with_parent(|parent| {
            assert!(parent.allocated.is_empty());
            assert_eq!(parent.calls.last(), Some(&ParentCall::Free(50, 2)));
        });
        assert_eq!(msi.hwirq(50), None);
        assert_eq!(msi.alloc(60, 4), Ok(64));
    }

    #[test]
    fn parent_failure_on_first_vector() {
        let msi = PchMsi::new(
            MsiConfig::new(RouteModel::Ht, false, ADDRESS),
            FakeParent {
                fail_virq: Some(7),
                ..FakeParent::default()
            },
        )
        .unwrap();
        assert_eq!(msi.alloc(7, 2), Err(MsiError::Parent(DomainError::Rejected(7))));
        msi.with_parent(|parent| {
            assert!(!parent.calls.iter().any(|call| matches!(call, ParentCall::Free(..))));
        });
    }

    #[test]
    fn chip_ops_reach_device_and_parent() {
        let msi = ht_msi(false);
        msi.alloc(40, 1).unwrap();
        let mut desc = FakeMsiDescriptor::default();
        msi.mask_msi_irq(40, &mut desc);
        assert!(desc.masked);
        msi.with_parent(|parent| assert!(parent.masked.contains(&40)));
        msi.unmask_msi_irq(40, &mut desc);
        assert!(!desc.masked);
        msi.with_parent(|parent| assert!(!parent.masked.contains(&40)));
        msi.ack(40);
        assert_eq!(
            msi.set_affinity(40, CpuMask::from_bits(0b110)),
            Ok(CpuMask::from_bits(0b110))
        );
        msi.with_parent(|parent| {
            assert_eq!(
                &parent.calls[parent.calls.len() - 2..],
                &[
                    ParentCall::Ack(40),
                    ParentCall::SetAffinity(40, CpuMask::from_bits(0b110))
                ]
            );
        });
    }

    #[test]
    fn stacked_on_pic() {
        use crate::pic::{IrqLayout, Ls2kIrq, Ls2kPic, PicRegisters};
        use safe_mmio::UniqueMmioPointer;

        let mut regs = PicRegisters::fake();
        {
            let irq = Ls2kIrq::new(
                Ls2kPic::new(UniqueMmioPointer::from(&mut regs)),
                IrqLayout::default(),
            );
            let config = MsiConfig {
                irq_first: 40,
                num_irqs: 32,
                model: RouteModel::Ht,
                address: ADDRESS,
            };
            let msi = PchMsi::new(config, &irq).unwrap();
            // PIC hwirq 40 is line 32, virq 96.
            assert_eq!(msi.alloc(96, 2), Ok(40));
            assert_eq!(
                msi.alloc(200, 1),
                Err(MsiError::Parent(DomainError::Conflict {
                    virq: 200,
                    hwirq: 42
                }))
            );
            msi.unmask(97);
        }
        assert_eq!(regs.hi.enset.0, 1 << 1);
    }
}
