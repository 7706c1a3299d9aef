//! Edge case and property tests for cc0-lex.
