// Id alphabets

pub const USER_ID_LENGTH: usize = 16;
pub const UPLOAD_ID_LENGTH: usize = 20;

/// Excludes visually ambiguous characters (0, O, I, l).
pub const USER_ID_ALPHABET: [char; 57] = [
	'1', '2', '3', '4', '5', '6', '7', '8', '9',
	'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'J', 'K', 'L', 'M', 'N', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z',
	'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z'
];

pub const ALPHANUMERIC_CHARS: [char; 62] = [
	'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
	'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z',
	'0', '1', '2', '3', '4', '5', '6', '7', '8', '9'
];

// Upload limits

pub const MAX_CHUNK_BODY_SIZE: usize = 80 * 1024 * 1024; // 80 MiB, plus a bit of overhead for multipart framing
pub const MAX_PROBE_BODY_SIZE: usize = 5 * 1024 * 1024; // 5 MiB

// History

pub const MAX_HISTORY_ENTRIES: usize = 200;
