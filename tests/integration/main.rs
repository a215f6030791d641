//! Integration tests: the scan pipeline end to end over an in-memory
//! quote source.

mod mock_source;
mod scanning;
