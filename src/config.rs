use std::{env, fs};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Config {
	/** The ip address of the server without the port. e.g. 127.0.0.1 */
	pub ip_address: String,

	/** The port the server should listen on. */
	pub port: u16,

	/** Root directory under which state, scratch and output live. */
	pub data_dir: String,

	/** Path to the single JSON state document. */
	pub state_file_path: PathBuf,

	/** Directory holding per-upload chunk scratch subdirectories. */
	pub scratch_dir: PathBuf,

	/** Directory holding assembled final files. */
	pub output_dir: PathBuf
}

/** Gets an environment variable's value by its name or panics if the key couldn't be found. */
fn get_env_var(key: &str) -> String {
	env::var(key).expect(format!("Missing {} in .env", key).as_str())
}

impl Config {
	pub fn default() -> Config {
		let data_dir = "data".to_string();

		Config {
			ip_address: "0.0.0.0".to_string(),
			port: 3001,
			state_file_path: Path::new(&data_dir).join("state.json"),
			scratch_dir: Path::new(&data_dir).join("uploads"),
			output_dir: Path::new(&data_dir).join("files"),
			data_dir
		}
	}

	pub fn initialise() -> Result<Config, Box<dyn std::error::Error>> {
		// Create .env file with default values if one doesn't exist already.
		if !Path::new(".env").exists() {
			println!("Creating new .env file since none was found.");

			let config = Config::default();

			let mut contents = String::new();
			contents.push_str(format!("IP_ADDRESS={}\n", config.ip_address).as_str());
			contents.push_str(format!("PORT={}\n", config.port).as_str());
			contents.push_str(format!("DATA_DIR={}", config.data_dir).as_str());

			fs::write(".env", contents)?;
		}

		// Read .env file
		dotenvy::dotenv()?;

		// Fill config
		let mut config: Config = Config::default();

		config.ip_address = get_env_var("IP_ADDRESS");
		config.port = get_env_var("PORT").trim().parse()?;
		config.data_dir = get_env_var("DATA_DIR");

		config.state_file_path = Path::new(&config.data_dir).join("state.json");
		config.scratch_dir = Path::new(&config.data_dir).join("uploads");
		config.output_dir = Path::new(&config.data_dir).join("files");

		// The state file path cannot be a directory! It must be the actual path to the state document.
		assert_eq!(
			config.state_file_path.is_dir(), false,
			"The derived state file path CANNOT be a directory! It must be the path to the state document."
		);

		Ok(config)
	}

	/// Creates the scratch/output directories (and the state file's parent) if they don't already exist.
	pub fn initialise_directories(&self) -> Result<(), Box<dyn std::error::Error>> {
		fs::create_dir_all(&self.scratch_dir)?;
		fs::create_dir_all(&self.output_dir)?;

		if let Some(parent) = self.state_file_path.parent() {
			fs::create_dir_all(parent)?;
		}

		Ok(())
	}
}
