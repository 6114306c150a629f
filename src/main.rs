use clap::{Parser, Subcommand};
use filterhub::catalog::{self, Filter};
use filterhub::feed::{FeedState, fetch_image};
use filterhub::imaging::{ImagingError, Quality, RustEngine, encode_jpeg, load_image};
use filterhub::net::ReqwestClient;
use filterhub::session::{EditSession, spawn_fan_out};
use filterhub::{config, output, publish};
use image::DynamicImage;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "filterhub")]
#[command(about = "Apply photo filters and share them on FilterHub")]
#[command(long_about = "\
Apply photo filters and share them on FilterHub

Filters come from a fixed catalog of 17 effects. Each can be named by its
raw identifier (CIPhotoEffectNoir) or its display name (Noir).

Typical flow:

  filterhub filters                              # list the catalog
  filterhub thumbnails photo.jpg --out-dir strip # preview every filter
  filterhub apply photo.jpg Noir noir.jpg        # render one at full size
  filterhub publish photo.jpg -d \"hello\" -f Noir # upload with a caption
  filterhub feed --images feed/                  # browse what was posted

Settings are read from config.toml in --config-dir. Run
'filterhub gen-config' to generate a documented one.

Set RUST_LOG=info (or debug) for diagnostic logging.")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml
    #[arg(long, default_value = ".", global = true)]
    config_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List every filter in catalog order
    Filters,
    /// Fetch and list the community feed
    Feed {
        /// Also download each post's image into this directory
        #[arg(long)]
        images: Option<PathBuf>,
    },
    /// Apply one filter to a photo at full size
    Apply {
        input: PathBuf,
        /// Raw or display filter name
        filter: String,
        output: PathBuf,
    },
    /// Render a thumbnail of a photo under every filter
    Thumbnails {
        input: PathBuf,
        #[arg(long, default_value = "thumbnails")]
        out_dir: PathBuf,
    },
    /// Upload a photo with a caption
    Publish {
        input: PathBuf,
        #[arg(short, long)]
        description: Option<String>,
        /// Filter to apply before uploading
        #[arg(short, long)]
        filter: Option<String>,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Filters => {
            output::print_filter_catalog(&catalog::descriptors());
        }
        Command::Feed { images } => {
            let config = config::load_config(&cli.config_dir)?;
            let client = ReqwestClient::new(config.api.timeout())?;
            let feed = FeedState::new();
            let update = feed.refresh(&client, &config.api.feed_url)?;
            log::info!("{}", output::format_feed_update(update));
            let posts = feed.posts();

            let saved = match images {
                Some(dir) => {
                    init_thread_pool(&config.processing);
                    std::fs::create_dir_all(&dir)?;
                    posts
                        .par_iter()
                        .enumerate()
                        .map(|(row, post)| {
                            let path = dir.join(post.image_filename(row));
                            fetch_image(&client, &post.image_url).save(&path)?;
                            Ok(path)
                        })
                        .collect::<Result<Vec<_>, image::ImageError>>()?
                }
                None => Vec::new(),
            };
            let saved: Vec<&Path> = saved.iter().map(PathBuf::as_path).collect();
            output::print_feed(&posts, &saved);
        }
        Command::Apply {
            input,
            filter,
            output: out_path,
        } => {
            let config = config::load_config(&cli.config_dir)?;
            let filter = resolve_filter(&filter)?;
            let session = EditSession::new(load_image(&input)?, 0);
            let preview = session.select(&RustEngine, filter)?;
            save_image(&preview, &out_path, config.publish.quality())?;
            output::print_apply_result(filter, (preview.width(), preview.height()), &out_path);
        }
        Command::Thumbnails { input, out_dir } => {
            let config = config::load_config(&cli.config_dir)?;
            init_thread_pool(&config.processing);
            let session = Arc::new(EditSession::new(
                load_image(&input)?,
                config.thumbnails.max_edge,
            ));

            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_fan_out_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let worker = spawn_fan_out(
                Arc::new(RustEngine),
                Arc::clone(&session),
                Filter::ALL.to_vec(),
                Some(tx),
            );
            worker.join().map_err(|_| "thumbnail worker panicked")?;
            printer.join().map_err(|_| "printer thread panicked")?;

            std::fs::create_dir_all(&out_dir)?;
            let mut saved = Vec::new();
            for filter in Filter::ALL {
                if let Some(thumb) = session.thumbnails().for_filter(filter) {
                    let path = out_dir.join(format!("{}.png", filter.display_identifier()));
                    thumb.save(&path)?;
                    saved.push((filter, path));
                }
            }
            let saved: Vec<(Filter, &Path)> =
                saved.iter().map(|(f, p)| (*f, p.as_path())).collect();
            output::print_saved_thumbnails(&saved);
        }
        Command::Publish {
            input,
            description,
            filter,
        } => {
            let config = config::load_config(&cli.config_dir)?;
            let session = EditSession::new(load_image(&input)?, 0);
            if let Some(name) = filter {
                session.select(&RustEngine, resolve_filter(&name)?)?;
            }
            let client = ReqwestClient::new(config.api.timeout())?;
            let preview = session.preview();
            let outcome = publish::publish(
                &client,
                &config.api.publish_url,
                Some(preview.as_ref()),
                description.as_deref(),
                config.publish.quality(),
            )?;
            output::print_publish_outcome(
                outcome,
                &config.api.publish_url,
                description.as_deref(),
            );
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores: users can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

fn resolve_filter(name: &str) -> Result<Filter, ImagingError> {
    Filter::from_name(name).ok_or_else(|| ImagingError::UnknownFilter(name.to_string()))
}

/// Write `image` to `path`, picking the encoder from the extension.
/// JPEG goes through the same encoder as uploads so quality is honoured.
fn save_image(
    image: &DynamicImage,
    path: &Path,
    quality: Quality,
) -> Result<(), Box<dyn std::error::Error>> {
    let is_jpeg = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("jpg") || e.eq_ignore_ascii_case("jpeg"));
    if is_jpeg {
        std::fs::write(path, encode_jpeg(image, quality)?)?;
    } else {
        image.save(path)?;
    }
    Ok(())
}
