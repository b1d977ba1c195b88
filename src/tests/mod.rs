mod support;
mod sync_tests;
