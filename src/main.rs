use clap::{Parser, Subcommand};
use isoplug::codec::{DiskImageCodec, IsoCodec, PluginType};
use isoplug::identifier::Region;
use isoplug::logging::Logger;
use isoplug::session::Direction;
use isoplug::settings;
use std::io::Read;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "isoplug", about = "Inspect and copy raw ISO disk images through the ISO codec plugin")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show plugin descriptor and image metadata
    Info {
        input: PathBuf,
    },
    /// Print the game identifier found near the start of the image
    Id {
        input: PathBuf,
    },
    /// Print the volume identifier from the primary volume descriptor
    Title {
        input: PathBuf,
    },
    /// Copy an image through a read session and a write session
    Copy {
        input:  PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// Chunk size in KiB for each read/write round trip
        #[arg(long, default_value = "1024")]
        chunk_size: usize,
        /// Enable the plugin's I/O buffering
        #[arg(short, long)]
        buffer: bool,
        /// Plugin buffer size in bytes
        #[arg(long)]
        buffer_size: Option<u64>,
        /// Compare BLAKE3 digests of input and output after the copy
        #[arg(long)]
        verify: bool,
    },
    /// Print the settings schema the plugin advertises
    Settings {
        /// Schema for write sessions instead of read sessions
        #[arg(short, long)]
        write: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    match Cli::parse().command {

        // ── Info ─────────────────────────────────────────────────────────────
        Commands::Info { input } => {
            let desc  = IsoCodec::descriptor();
            let mut codec = open_reader(&input, None)?;

            println!("── ISO Image ────────────────────────────────────────────");
            println!("  Plugin         {} {}", desc.name, desc.version);
            println!("  Extensions     {}", desc.extensions_joined());
            println!("  Path           {}", input.display());
            println!("  Size           {} B", codec.disk_size());
            println!("  Disks          {}", codec.total_disks());
            match codec.try_identifier() {
                Ok(id) => {
                    let region = id.region().map(Region::name).unwrap_or("unknown");
                    println!("  Game ID        {} ({})", id, region);
                }
                Err(e) => println!("  Game ID        — ({e})"),
            }
            match codec.try_title() {
                Ok(title) => println!("  Title          {}", title),
                Err(e)    => println!("  Title          — ({e})"),
            }
            codec.close();
        }

        // ── Id ───────────────────────────────────────────────────────────────
        Commands::Id { input } => {
            let mut codec = open_reader(&input, None)?;
            let id = codec.identifier().ok_or_else(|| failure(&codec))?;
            println!("{}", id);
            codec.close();
        }

        // ── Title ────────────────────────────────────────────────────────────
        Commands::Title { input } => {
            let mut codec = open_reader(&input, None)?;
            let title = codec.title().ok_or_else(|| failure(&codec))?;
            println!("{}", title);
            codec.close();
        }

        // ── Copy ─────────────────────────────────────────────────────────────
        Commands::Copy { input, output, chunk_size, buffer, buffer_size, verify } => {
            let payload = settings_payload(buffer, buffer_size);
            let mut reader = open_reader(&input, payload.as_deref())?;

            let mut writer = IsoCodec::with_logger(Logger::facade());
            if let Some(json) = payload.as_deref() {
                if !writer.apply_settings(json) {
                    return Err(failure(&writer));
                }
            }
            if !writer.open(&output, PluginType::WRITER, 0) {
                return Err(failure(&writer));
            }

            let mut chunk = vec![0u8; chunk_size.max(1) * 1024];
            let mut hasher = blake3::Hasher::new();
            let mut copied = 0u64;
            loop {
                let n = reader.read(&mut chunk) as usize;
                if !reader.is_ok() {
                    return Err(failure(&reader));
                }
                if n == 0 { break; }
                hasher.update(&chunk[..n]);
                if writer.write(&chunk[..n]) as usize != n {
                    return Err(failure(&writer));
                }
                copied += n as u64;
            }
            reader.close();
            if !writer.close() {
                return Err(failure(&writer));
            }
            println!("Copied {} B → {}", copied, output.display());

            if verify {
                let source = hasher.finalize();
                let copy   = hash_file(&output)?;
                println!("  source  {}", hex::encode(source.as_bytes()));
                println!("  copy    {}", hex::encode(copy.as_bytes()));
                if source != copy {
                    return Err("digest mismatch between source and copy".into());
                }
                println!("Verified.");
            }
        }

        // ── Settings ─────────────────────────────────────────────────────────
        Commands::Settings { write } => {
            let direction = if write { Direction::Write } else { Direction::Read };
            println!("{}", settings::schema_json(direction));
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn failure(codec: &IsoCodec) -> Box<dyn std::error::Error> {
    codec.error().to_string().into()
}

fn open_reader(path: &Path, payload: Option<&str>) -> Result<IsoCodec, Box<dyn std::error::Error>> {
    let mut codec = IsoCodec::with_logger(Logger::facade());
    if let Some(json) = payload {
        if !codec.apply_settings(json) {
            return Err(failure(&codec));
        }
    }
    if !codec.open(path, PluginType::READER, 0) {
        return Err(failure(&codec));
    }
    Ok(codec)
}

fn settings_payload(buffer: bool, buffer_size: Option<u64>) -> Option<String> {
    if !buffer && buffer_size.is_none() {
        return None;
    }
    let mut map = serde_json::Map::new();
    if buffer {
        map.insert("enable_buffer".into(), serde_json::Value::Bool(true));
    }
    if let Some(size) = buffer_size {
        map.insert("buffer_size".into(), size.into());
    }
    Some(serde_json::Value::Object(map).to_string())
}

fn hash_file(path: &Path) -> std::io::Result<blake3::Hash> {
    let mut file   = std::fs::File::open(path)?;
    let mut hasher = blake3::Hasher::new();
    let mut buf    = vec![0u8; 1 << 20];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 { break; }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize())
}
