//! OpenTot Player: desktop shell around the Tot scene engine
//!
//! Architecture:
//!   assets/   - data files, palette, `ResourceLoader` implementation
//!   engine/   - minifb window as the engine `Host`, input dispatch, game loop
//!
//! Rooms, compositing, walking and save games live in `opentot-scene`.

mod assets;
mod engine;

use anyhow::{Context, Result};
use clap::Parser;
use opentot_common::{AppConfig, CONFIG_FILE_NAME};
use opentot_scene::clock::Chrono;
use opentot_scene::room::RoomRegistry;
use opentot_scene::save::SaveSlots;
use opentot_scene::GameSession;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "opentot", version, about = "Play Tot from its original data files")]
struct Args {
    /// Directory holding PANTALLA.DAT, OBJETOS.DAT and the bitmap archive
    data_dir: Option<PathBuf>,

    /// Config file (default: ./opentot.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Room to start in
    #[arg(short, long)]
    room: Option<u16>,

    /// Window scale factor
    #[arg(short, long)]
    scale: Option<u32>,

    #[arg(long)]
    save_dir: Option<PathBuf>,

    /// Log level for the opentot crates (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

impl Args {
    /// Command line wins over the config file
    fn apply(self, config: &mut AppConfig) {
        if let Some(dir) = self.data_dir {
            config.data_dir = dir;
        }
        if let Some(room) = self.room {
            config.start_room = room;
        }
        if let Some(scale) = self.scale {
            config.window.scale = scale;
        }
        if let Some(dir) = self.save_dir {
            config.save_dir = dir;
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config_path = args.config.clone().unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
    let mut config = AppConfig::load_or_default(&config_path)
        .with_context(|| format!("Cannot load config {}", config_path.display()))?;
    args.apply(&mut config);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(format!("opentot={}", config.log_level).parse()?))
        .init();

    tracing::info!("OpenTot Player v{}", env!("CARGO_PKG_VERSION"));

    let game_dir = check_game_dir(&config.data_dir)?;
    tracing::info!("Game data: {}", game_dir.display());

    let assets = assets::AssetStore::load(game_dir)?;
    let registry = RoomRegistry::open(&assets.room_file()).context("Cannot open the room file")?;
    tracing::info!("{} rooms, {} items", registry.room_count(), assets.items().len());

    let items = assets.items().clone();
    let palette = assets.palette().clone();
    let chrono = Chrono::from(&config.timing);
    let mut session = GameSession::new(assets, registry, items, chrono).context("Cannot start the game session")?;
    session
        .load_screen_data(config.start_room)
        .with_context(|| format!("Cannot enter room {}", config.start_room))?;

    let host = engine::MinifbHost::new(&config.window, palette)?;
    let slots = SaveSlots::new(&config.save_dir);

    // Start game engine
    engine::run(session, host, slots)
}

/// The data directory must hold at least the room and item files
fn check_game_dir(dir: &Path) -> Result<&Path> {
    for name in [assets::ROOM_FILE, assets::ITEM_FILE] {
        if !dir.join(name).is_file() {
            anyhow::bail!(
                "{} not found in {}. Pass the game data directory as the first argument or set data_dir in {}",
                name,
                dir.display(),
                CONFIG_FILE_NAME
            );
        }
    }
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_overrides_config() {
        let args = Args::parse_from(["opentot", "/juegos/tot", "--room", "4", "-s", "2"]);
        let mut config = AppConfig::default();
        config.window.fps = 30;
        args.apply(&mut config);

        assert_eq!(config.data_dir, PathBuf::from("/juegos/tot"));
        assert_eq!(config.start_room, 4);
        assert_eq!(config.window.scale, 2);
        assert_eq!(config.window.fps, 30);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_game_dir_needs_room_and_item_files() {
        let dir = std::env::temp_dir().join(format!("opentot_gamedir_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(assets::ROOM_FILE), b"").unwrap();
        assert!(check_game_dir(&dir).is_err());

        std::fs::write(dir.join(assets::ITEM_FILE), b"").unwrap();
        assert_eq!(check_game_dir(&dir).unwrap(), dir.as_path());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
