//! The before/after-instruction plugin contract.

use thiserror::Error;

use crate::consts::{Word, N_MAX_PLUGINS};
use crate::image::Image;
use crate::interpreter::registers::Registers;
use crate::interpreter::RunError;

/// A read-only view of VM state handed to plugin hooks. Plugins may only
/// observe; nothing in this type allows mutation.
pub struct VmView<'a> {
    image: &'a Image,
    registers: &'a Registers,
}

impl<'a> VmView<'a> {
    pub(crate) fn new(image: &'a Image, registers: &'a Registers) -> Self {
        Self { image, registers }
    }

    pub fn memory(&self) -> &[Word] {
        self.image.memory()
    }

    pub const fn registers(&self) -> &Registers {
        self.registers
    }

    pub const fn program_size(&self) -> usize {
        self.image.program_size
    }
}

/// Raised by a plugin's `init` hook; the run aborts with this failure.
#[derive(Debug, Error)]
#[error("plugin initialization failed")]
pub struct PluginInitError;

/// A named observer invoked around every executed instruction.
///
/// `before`/`after` default to no-ops, matching the reference
/// implementation's dummy hook stubs — a plugin only needs to override the
/// hooks it cares about.
pub trait Plugin {
    fn name(&self) -> &str;

    /// Produces the plugin's per-run state. Called once, before execution
    /// begins, for every registered plugin.
    fn init(&mut self, vm: &VmView) -> Result<(), PluginInitError>;

    fn before(&mut self, _vm: &VmView, _opcode: Word) {}

    fn after(&mut self, _vm: &VmView, _opcode: Word) {}
}

/// Holds the registered plugins for one run, in registration order.
#[derive(Default)]
pub struct PluginHost {
    plugins: Vec<Box<dyn Plugin>>,
}

impl PluginHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `plugin`. Fails if the host already holds `N_MAX_PLUGINS`.
    pub fn register(&mut self, plugin: Box<dyn Plugin>) -> Result<(), RunError> {
        if self.plugins.len() >= N_MAX_PLUGINS {
            return Err(RunError::TooManyPlugins);
        }
        self.plugins.push(plugin);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub(crate) fn init_all(&mut self, vm: &VmView) -> Result<(), RunError> {
        for plugin in &mut self.plugins {
            plugin.init(vm).map_err(|_| RunError::PluginInitFailed(plugin.name().to_owned()))?;
        }
        Ok(())
    }

    pub(crate) fn before_all(&mut self, vm: &VmView, opcode: Word) {
        for plugin in &mut self.plugins {
            plugin.before(vm, opcode);
        }
    }

    pub(crate) fn after_all(&mut self, vm: &VmView, opcode: Word) {
        for plugin in &mut self.plugins {
            plugin.after(vm, opcode);
        }
    }
}
