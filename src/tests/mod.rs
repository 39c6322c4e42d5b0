//! Cross-module integration tests, one file per concern.
