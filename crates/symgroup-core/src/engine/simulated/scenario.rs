//! TOML description of a simulated debuggee.
//!
//! ```toml
//! pointer_size = 8
//! modules = ["Qt5Cored"]
//!
//! [[structs]]
//! name = "Point"
//! size = 8
//! fields = [{ name = "x", type = "int", offset = 0 }, { name = "y", type = "int", offset = 4 }]
//!
//! [[memory]]
//! address = 0x1000
//! bytes = "0500000007000000"
//!
//! [[values]]
//! address = 0x1004
//! type = "int"
//! value = "9"
//!
//! [[frames]]
//! function = "main"
//! locals = [{ name = "pt", type = "Point", address = 0x1000 }]
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use super::types::{EnumDef, StructDef};
use super::SimulatedProcess;
use crate::engine::EngineError;
use crate::types::{Address, ThreadId};

/// Errors while loading a scenario.
#[derive(Error, Debug)]
pub enum ScenarioError
{
    #[error("Failed to read scenario {}: {source}", .path.display())]
    Read
    {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid scenario: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid memory bytes at 0x{address:x}: {source}")]
    InvalidBytes
    {
        address: u64,
        #[source]
        source: hex::FromHexError,
    },

    #[error("Cannot store value at 0x{address:x}: {source}")]
    Value
    {
        address: u64,
        #[source]
        source: EngineError,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct MemoryRegion
{
    pub address: u64,
    /// Hex encoded contents
    pub bytes: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ValueInit
{
    pub address: u64,
    #[serde(rename = "type")]
    pub type_name: String,
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VariableDef
{
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub address: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FrameDef
{
    #[serde(default = "default_thread")]
    pub thread: u64,
    #[serde(default)]
    pub frame: u32,
    pub function: String,
    #[serde(default)]
    pub locals: Vec<VariableDef>,
}

/// A watch expression shown by the replay tool.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchDef
{
    pub iname: String,
    pub expression: String,
}

/// Complete scenario file.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario
{
    #[serde(default = "default_pointer_size")]
    pub pointer_size: u64,
    #[serde(default = "default_thread")]
    pub current_thread: u64,
    #[serde(default)]
    pub modules: Vec<String>,
    #[serde(default)]
    pub structs: Vec<StructDef>,
    #[serde(default)]
    pub enums: Vec<EnumDef>,
    #[serde(default)]
    pub memory: Vec<MemoryRegion>,
    #[serde(default)]
    pub values: Vec<ValueInit>,
    #[serde(default)]
    pub frames: Vec<FrameDef>,
    #[serde(default)]
    pub globals: Vec<VariableDef>,
    #[serde(default)]
    pub watches: Vec<WatchDef>,
    /// Every injected call crashes
    #[serde(default)]
    pub crash_calls: bool,
}

fn default_pointer_size() -> u64
{
    8
}

fn default_thread() -> u64
{
    1
}

impl Scenario
{
    /// Parse a scenario from TOML text.
    ///
    /// ## Errors
    ///
    /// Returns [`ScenarioError::Parse`] for invalid TOML or missing fields.
    pub fn from_toml(text: &str) -> Result<Self, ScenarioError>
    {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a scenario file.
    ///
    /// ## Errors
    ///
    /// Fails if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ScenarioError>
    {
        let text = std::fs::read_to_string(path).map_err(|source| ScenarioError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Build the simulated process described by this scenario.
    ///
    /// ## Errors
    ///
    /// Fails for undecodable memory bytes or values that cannot be stored.
    pub fn build(&self) -> Result<SimulatedProcess, ScenarioError>
    {
        let mut process = SimulatedProcess::new(self.pointer_size);
        process.set_current_thread(ThreadId(self.current_thread));
        process.set_crash_calls(self.crash_calls);
        for module in &self.modules {
            process.add_module(module);
        }
        for def in &self.structs {
            process.add_struct(def.clone());
        }
        for def in &self.enums {
            process.add_enum(def.clone());
        }
        for region in &self.memory {
            let bytes = hex::decode(region.bytes.split_whitespace().collect::<String>()).map_err(|source| {
                ScenarioError::InvalidBytes {
                    address: region.address,
                    source,
                }
            })?;
            process.map_memory(Address::new(region.address), bytes);
        }
        for init in &self.values {
            process
                .write_value(Address::new(init.address), &init.type_name, &init.value)
                .map_err(|source| ScenarioError::Value {
                    address: init.address,
                    source,
                })?;
        }
        for frame in &self.frames {
            let locals: Vec<(&str, &str, Address)> = frame
                .locals
                .iter()
                .map(|v| (v.name.as_str(), v.type_name.as_str(), Address::new(v.address)))
                .collect();
            process.add_frame(ThreadId(frame.thread), frame.frame, &frame.function, &locals);
        }
        for global in &self.globals {
            process.add_global(&global.name, &global.type_name, Address::new(global.address));
        }
        Ok(process)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::engine::DebugTarget;

    const SCENARIO: &str = r#"
        modules = ["Qt5Cored"]

        [[structs]]
        name = "Point"
        keyword = "class"
        size = 8
        fields = [{ name = "x", type = "int", offset = 0 }, { name = "y", type = "int", offset = 4 }]

        [[memory]]
        address = 0x1000
        bytes = "05000000 07000000"

        [[values]]
        address = 0x1004
        type = "int"
        value = "9"

        [[frames]]
        function = "main"
        locals = [{ name = "pt", type = "Point", address = 0x1000 }]
    "#;

    #[test]
    fn test_build_scenario()
    {
        let scenario = Scenario::from_toml(SCENARIO).unwrap();
        let target = scenario.build().unwrap().into_target();
        assert_eq!(target.modules(), vec!["Qt5Cored".to_string()]);
        assert_eq!(target.frame_function(ThreadId(1), 0).unwrap(), "main");
        assert_eq!(target.read_memory(Address::new(0x1004), 1).unwrap(), vec![9]);
    }

    #[test]
    fn test_invalid_bytes()
    {
        let scenario = Scenario::from_toml("[[memory]]\naddress = 16\nbytes = \"zz\"\n").unwrap();
        assert!(matches!(scenario.build(), Err(ScenarioError::InvalidBytes { address: 16, .. })));
    }
}
