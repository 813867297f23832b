//! Constants for the download module (wire format, buffer sizing).

/// Default TCP port for plain HTTP.
pub const DEFAULT_PORT: u16 = 80;

/// Default size of a single read from the connection (8 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// Smallest accepted read chunk size.
pub const MIN_CHUNK_SIZE: usize = 16;

/// Largest accepted read chunk size (1 MiB).
pub const MAX_CHUNK_SIZE: usize = 1024 * 1024;

/// The header buffer may hold at most this many chunks before the
/// terminator must have been seen.
pub const HEADER_LIMIT_CHUNKS: usize = 4;

/// Marks the end of the response header section.
pub const HEADER_TERMINATOR: &[u8; 4] = b"\r\n\r\n";

/// Header name matched case-insensitively when extracting the body length.
pub const CONTENT_LENGTH_PREFIX: &str = "Content-Length:";
