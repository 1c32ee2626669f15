pub mod core;
pub mod cpu;
pub mod device;

pub mod prelude {
    pub use crate::core::machine::{InputButton, Machine, MachineError};
    pub use crate::core::{Bus, BusError, BusMap, Component, Region};
    pub use crate::cpu::Cpu;
}
