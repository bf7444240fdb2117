// This file is the module declaration file for the `builders` module.
// It declares and makes public the sub-modules within `src/builders/`.

// `coverage` module:
// Defines the per-process measurement artifact (`Measurement`), its
// set-union merge, and the exclude-before-percentage accounting that turns
// measured lines plus source text into per-file coverage numbers.
pub mod coverage;

// `patterns` module:
// The matching primitives the two loaders hand to their consumers: glob
// path matching with directory-prefix semantics (`PathMatcher`), rule-code
// prefix suppression (`RuleSuppressor`), and the line-exclusion regex union
// with its built-in defaults (`LineExcluder`).
pub mod patterns;

// `reporter` module:
// Assembles the coverage report (omit filtering, skip-covered hiding,
// aggregate totals) and renders it, along with style diagnostics, to the
// console.
pub mod reporter;

// `validator` module:
// Semantic checks over loaded configuration: settings that parse fine but
// are almost certainly mistakes, returned as a list of issues.
pub mod validator;
