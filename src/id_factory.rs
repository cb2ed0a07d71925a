use crate::constants;

/// Generates a candidate user id. Callers are responsible for retrying on collision against
/// the current state (62^20 / 57^16 makes a collision astronomically unlikely, but the state
/// store is the source of truth).
pub fn generate_user_id() -> String {
	nanoid::nanoid!(constants::USER_ID_LENGTH, &constants::USER_ID_ALPHABET)
}

pub fn generate_upload_id() -> String {
	nanoid::nanoid!(constants::UPLOAD_ID_LENGTH, &constants::ALPHANUMERIC_CHARS)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn user_id_uses_expected_alphabet_and_length() {
		for _ in 0..200 {
			let id = generate_user_id();
			assert_eq!(id.chars().count(), constants::USER_ID_LENGTH);
			assert!(id.chars().all(|c| constants::USER_ID_ALPHABET.contains(&c)));
		}
	}

	#[test]
	fn upload_id_uses_expected_alphabet_and_length() {
		for _ in 0..200 {
			let id = generate_upload_id();
			assert_eq!(id.chars().count(), constants::UPLOAD_ID_LENGTH);
			assert!(id.chars().all(|c| constants::ALPHANUMERIC_CHARS.contains(&c)));
		}
	}

	#[test]
	fn user_id_alphabet_excludes_ambiguous_characters() {
		for c in ['0', 'O', 'I', 'l'] {
			assert!(!constants::USER_ID_ALPHABET.contains(&c));
		}
	}
}
