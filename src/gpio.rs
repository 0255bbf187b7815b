// Copyright 2026 The loongson-intc Authors.
// This project is dual-licensed under Apache 2.0 and MIT terms.
// See LICENSE-APACHE and LICENSE-MIT for details.

//! Driver for the GPIO controllers of Loongson-3 processors and the LS7A bridge.
//!
//! The register offsets within the block differ between boards, and are given at runtime by
//! [`GpioConfig`].

use core::{marker::PhantomData, ptr::NonNull};
use log::{debug, error};
use spin::Mutex;
use thiserror::Error;

/// Errors from the GPIO driver.
#[derive(Copy, Clone, Debug, Eq, Error, PartialEq)]
pub enum GpioError {
    /// The pin is not one of the controller's lines.
    #[error("GPIO pin {0} is out of range")]
    InvalidPin(u32),
    /// The variant cannot have this many lines.
    #[error("{0} GPIO lines is too many for this controller")]
    TooManyLines(u16),
    /// A register offset is not aligned to the register size.
    #[error("GPIO register offset {0:#x} is misaligned")]
    Misaligned(usize),
}

/// Register layout of a GPIO controller.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum GpioVariant {
    /// Loongson-3 processor GPIO: 32-bit direction, output and input registers, one bit per pin,
    /// with inputs from bit 16.
    Legacy,
    /// LS7A bridge GPIO: one byte per pin in each of the direction, output and input arrays.
    Ls7a,
    /// LS7A display controller GPIO: 64-bit direction and data registers, one bit per pin.
    Ls7aDc,
}

impl GpioVariant {
    /// Returns the variant for a device tree compatible string, platform device name or ACPI
    /// hardware ID.
    pub fn from_label(label: &str) -> Option<Self> {
        if label == "loongson-gpio" {
            Some(Self::Legacy)
        } else if label == "loongson,ls7a-gpio" || label.starts_with("LOON0002") {
            Some(Self::Ls7a)
        } else if label == "loongson,ls7a-dc-gpio" || label.starts_with("LOON0003") {
            Some(Self::Ls7aDc)
        } else {
            None
        }
    }

    /// Returns the name of the chip.
    pub fn label(self) -> &'static str {
        match self {
            Self::Legacy => "loongson-gpio",
            Self::Ls7a => "loongson,ls7a-gpio",
            Self::Ls7aDc => "loongson,ls7a-dc-gpio",
        }
    }

    /// Returns the largest number of lines the layout can address.
    pub fn max_lines(self) -> u16 {
        match self {
            Self::Legacy => 16,
            Self::Ls7a => 256,
            Self::Ls7aDc => 64,
        }
    }

    fn register_size(self) -> usize {
        match self {
            Self::Legacy => 4,
            Self::Ls7a => 1,
            Self::Ls7aDc => 8,
        }
    }
}

/// Per-board configuration of a GPIO controller.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct GpioConfig {
    /// Number of lines.
    pub ngpio: u16,
    /// Number of the first line in the system GPIO numbering.
    pub base: i32,
    /// Offset of the direction register or array.
    pub conf_offset: usize,
    /// Offset of the output register or array. Unused by [`GpioVariant::Ls7aDc`].
    pub out_offset: usize,
    /// Offset of the input register or array. [`GpioVariant::Ls7aDc`] also drives outputs here.
    pub in_offset: usize,
}

/// A Loongson GPIO controller.
///
/// All operations are serialised by an internal lock, so the controller can be shared between
/// CPUs.
pub struct LoongsonGpio<'a> {
    base: NonNull<u8>,
    variant: GpioVariant,
    config: GpioConfig,
    lock: Mutex<()>,
    _registers: PhantomData<&'a mut u8>,
}

// SAFETY: The register block is only accessed through volatile reads and writes with the lock held,
// and the caller of `new` guarantees exclusive access to it.
unsafe impl Send for LoongsonGpio<'_> {}
// SAFETY: As above, every register access takes the lock.
unsafe impl Sync for LoongsonGpio<'_> {}

impl<'a> LoongsonGpio<'a> {
    /// Creates the driver for the controller whose register block starts at `base`.
    ///
    /// For [`GpioVariant::Ls7aDc`] `base` is the base of the display controller registers.
    ///
    /// # Safety
    ///
    /// `base` must point to a mapped register block covering every register `config` selects for
    /// `config.ngpio` lines, which stays valid for `'a`. Nothing else may access the block during
    /// `'a`.
    pub unsafe fn new(
        base: NonNull<u8>,
        variant: GpioVariant,
        config: GpioConfig,
    ) -> Result<Self, GpioError> {
        if config.ngpio > variant.max_lines() {
            error!("{}: {} lines requested", variant.label(), config.ngpio);
            return Err(GpioError::TooManyLines(config.ngpio));
        }
        let size = variant.register_size();
        let offsets = [config.conf_offset, config.in_offset, config.out_offset];
        let used = if variant == GpioVariant::Ls7aDc {
            &offsets[..2]
        } else {
            &offsets[..]
        };
        if let Some(&offset) = used
            .iter()
            .find(|&&offset| !(base.as_ptr() as usize + offset).is_multiple_of(size))
        {
            return Err(GpioError::Misaligned(offset));
        }
        debug!(
            "{}: {} lines from GPIO {}",
            variant.label(),
            config.ngpio,
            config.base
        );
        Ok(Self {
            base,
            variant,
            config,
            lock: Mutex::new(()),
            _registers: PhantomData,
        })
    }

    /// Returns the register layout of the chip.
    pub fn variant(&self) -> GpioVariant {
        self.variant
    }

    /// Returns the name of the chip.
    pub fn label(&self) -> &'static str {
        self.variant.label()
    }

    /// Returns the number of lines.
    pub fn ngpio(&self) -> u16 {
        self.config.ngpio
    }

    /// Returns the number of the first line in the system GPIO numbering.
    pub fn base(&self) -> i32 {
        self.config.base
    }

    /// Accesses never sleep.
    pub fn can_sleep(&self) -> bool {
        false
    }

    fn check(&self, pin: u32) -> Result<(), GpioError> {
        if pin >= u32::from(self.config.ngpio) {
            return Err(GpioError::InvalidPin(pin));
        }
        Ok(())
    }

    /// Checks that the pin can be used.
    pub fn request(&self, pin: u32) -> Result<(), GpioError> {
        self.check(pin)
    }

    /// Makes the pin an input.
    pub fn direction_input(&self, pin: u32) -> Result<(), GpioError> {
        self.check(pin)?;
        let _guard = self.lock.lock();
        self.set_direction(pin, true);
        Ok(())
    }

    /// Makes the pin an output driving the given level.
    ///
    /// The level is set before the direction so the pin does not glitch.
    pub fn direction_output(&self, pin: u32, high: bool) -> Result<(), GpioError> {
        self.check(pin)?;
        let _guard = self.lock.lock();
        self.set_level(pin, high);
        self.set_direction(pin, false);
        Ok(())
    }

    /// Returns the level of the pin.
    pub fn get(&self, pin: u32) -> Result<bool, GpioError> {
        self.check(pin)?;
        let _guard = self.lock.lock();
        let value = match self.variant {
            GpioVariant::Legacy => (self.read32(self.config.in_offset) >> (pin + 16)) & 1 != 0,
            GpioVariant::Ls7a => self.read8(self.config.in_offset + pin as usize) & 1 != 0,
            GpioVariant::Ls7aDc => (self.read64(self.config.in_offset) >> pin) & 1 != 0,
        };
        Ok(value)
    }

    /// Sets the output level of the pin.
    pub fn set(&self, pin: u32, high: bool) -> Result<(), GpioError> {
        self.check(pin)?;
        let _guard = self.lock.lock();
        self.set_level(pin, high);
        Ok(())
    }

    fn set_direction(&self, pin: u32, input: bool) {
        match self.variant {
            GpioVariant::Legacy => self.update32(self.config.conf_offset, pin, input),
            GpioVariant::Ls7a => self.write8(self.config.conf_offset + pin as usize, input.into()),
            GpioVariant::Ls7aDc => self.update64(self.config.conf_offset, pin, input),
        }
    }

    fn set_level(&self, pin: u32, high: bool) {
        match self.variant {
            GpioVariant::Legacy => self.update32(self.config.out_offset, pin, high),
            GpioVariant::Ls7a => self.write8(self.config.out_offset + pin as usize, high.into()),
            GpioVariant::Ls7aDc => self.update64(self.config.in_offset, pin, high),
        }
    }

    fn update32(&self, offset: usize, bit: u32, set: bool) {
        let value = self.read32(offset);
        self.write32(offset, if set { value | (1 << bit) } else { value & !(1 << bit) });
    }

    fn update64(&self, offset: usize, bit: u32, set: bool) {
        let value = self.read64(offset);
        self.write64(offset, if set { value | (1 << bit) } else { value & !(1 << bit) });
    }

    fn read8(&self, offset: usize) -> u8 {
        // SAFETY: `new`'s caller guarantees the register at `offset` is mapped, and callers only
        // pass offsets of registers `config` selects for a checked pin.
        unsafe { self.base.as_ptr().add(offset).read_volatile() }
    }

    fn write8(&self, offset: usize, value: u8) {
        // SAFETY: As in `read8`.
        unsafe { self.base.as_ptr().add(offset).write_volatile(value) }
    }

    fn read32(&self, offset: usize) -> u32 {
        // SAFETY: As in `read8`, and `new` checked the offset is aligned for 32-bit registers.
        unsafe { self.base.as_ptr().add(offset).cast::<u32>().read_volatile() }
    }

    fn write32(&self, offset: usize, value: u32) {
        // SAFETY: As in `read32`.
        unsafe {
            self.base
                .as_ptr()
                .add(offset)
                .cast::<u32>()
                .write_volatile(value)
        }
    }

    fn read64(&self, offset: usize) -> u64 {
        // SAFETY: As in `read8`, and `new` checked the offset is aligned for 64-bit registers.
        unsafe { self.base.as_ptr().add(offset).cast::<u64>().read_volatile() }
    }

    fn write64(&self, offset: usize, value: u64) {
        // SAFETY: As in `read64`.
        unsafe {
            self.base
                .as_ptr()
                .add(offset)
                .cast::<u64>()
                .write_volatile(value)
        }
    }
}
