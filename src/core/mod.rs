// This file is the module declaration file for the `core` module.
// It declares the submodules under `src/core/` and exposes them to the
// rest of the crate.

// `config` module:
// This module owns the configuration surface. It defines the typed records
// (`StyleConfig`, `CoverageConfig`), the INI-style parser for the
// `checkrc.cfg`/`setup.cfg` file format, the `ConfigError` taxonomy, and the
// `ConfigManager`/`ConfigProvider` pair that discovers and loads the file.
pub mod config;

// `engine` module:
// This module applies a loaded `StyleConfig` the way the consuming linter
// would: skipping excluded paths, emitting line-length diagnostics, and
// dropping suppressed rule codes before anything is reported.
pub mod engine;
