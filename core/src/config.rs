//! file: core/src/config.rs
//! description: compiler options and generator settings.
//!
//! `CompilerOptions` describes the unit being compiled (top-level method,
//! eval-ness, locals visible from an enclosing binding). `GeneratorSettings`
//! describes how code is generated (debug info, tracing, compiler markers).
//! Both are plain serde types loaded from JSON.

use std::collections::HashSet;
use std::path::Path;

use log::warn;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigErrorKind};

/// Encoding of the source text; string literals are created in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceEncoding {
    #[default]
    Utf8,
    Binary,
    Ascii,
}

impl SourceEncoding {
    /// Resolves a magic-comment style label. Unknown labels fall back to UTF-8.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "utf-8" | "utf8" => SourceEncoding::Utf8,
            "binary" | "ascii-8bit" => SourceEncoding::Binary,
            "ascii" | "us-ascii" => SourceEncoding::Ascii,
            other => {
                warn!("unknown source encoding '{}', falling back to utf-8", other);
                SourceEncoding::Utf8
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SourceEncoding::Utf8 => "UTF-8",
            SourceEncoding::Binary => "ASCII-8BIT",
            SourceEncoding::Ascii => "US-ASCII",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerOptions {
    #[serde(default)]
    pub is_eval: bool,
    /// Name reported for the top-level method frame (`define_method` bodies, eval).
    #[serde(default)]
    pub top_level_method_name: Option<String>,
    #[serde(default)]
    pub top_level_parameter_names: Vec<String>,
    #[serde(default)]
    pub top_level_has_unsplat_parameter: bool,
    /// Locals of an enclosing binding that the unit may read.
    #[serde(default)]
    pub local_names: Vec<String>,
    #[serde(default = "default_initial_line")]
    pub initial_line: usize,
}

fn default_initial_line() -> usize { 1 }

impl Default for CompilerOptions {
    fn default() -> Self {
        CompilerOptions {
            is_eval: false,
            top_level_method_name: None,
            top_level_parameter_names: Vec::new(),
            top_level_has_unsplat_parameter: false,
            local_names: Vec::new(),
            initial_line: default_initial_line(),
        }
    }
}

impl CompilerOptions {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<CompilerOptions, ConfigError> {
        let options: CompilerOptions = read_json(path)?;
        options.validate()?;
        Ok(options)
    }

    pub fn from_json_str(text: &str) -> Result<CompilerOptions, ConfigError> {
        let options: CompilerOptions = serde_json::from_str(text)?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_line == 0 {
            return Err(ConfigError::invalid("initial_line must be at least 1", "compiler_options"));
        }
        if let Some(name) = &self.top_level_method_name {
            if name.trim().is_empty() {
                return Err(ConfigError::invalid("top_level_method_name is empty", "compiler_options"));
            }
        }
        if self.top_level_has_unsplat_parameter && self.top_level_parameter_names.is_empty() {
            return Err(ConfigError::invalid(
                "top_level_has_unsplat_parameter requires at least one parameter name",
                "compiler_options",
            ));
        }
        let mut seen = HashSet::new();
        for name in self.top_level_parameter_names.iter().chain(self.local_names.iter()) {
            if name.trim().is_empty() {
                return Err(ConfigError::invalid("empty local or parameter name", "compiler_options"));
            }
            if !seen.insert(name.as_str()) {
                return Err(ConfigError::invalid(
                    format!("duplicate local or parameter name '{}'", name),
                    "compiler_options",
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GeneratorSettings {
    /// Emit debug info when a symbol document is attached.
    #[serde(default)]
    pub debug_mode: bool,
    /// Emit trace hooks for top-level frames, method and block calls.
    #[serde(default)]
    pub enable_tracing: bool,
    /// Emit `X` marker calls that make generated code easier to step through.
    #[serde(default)]
    pub debug_compiler: bool,
}

impl GeneratorSettings {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<GeneratorSettings, ConfigError> {
        let settings: GeneratorSettings = read_json(path)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_json_str(text: &str) -> Result<GeneratorSettings, ConfigError> {
        let settings: GeneratorSettings = serde_json::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Every combination of flags is accepted; kept for symmetry with `CompilerOptions`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Ok(())
    }
}

fn read_json<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T, ConfigError> {
    let raw = std::fs::read_to_string(&path).map_err(|e| {
        ConfigError::new(
            ConfigErrorKind::Io,
            format!("read config '{}': {}", path.as_ref().display(), e),
            "config".to_string(),
        )
    })?;
    Ok(serde_json::from_str(&raw)?)
}
