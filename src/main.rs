use clap::{Parser, Subcommand};
use sep39::{checksum, decode, encode, MediaDescriptor, Slot, WireVersion};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "sep39", about = "SEP-39 asset packer for ledger ManageData slots")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pack a file into SEP-39 slots and print sizing stats
    Pack {
        input: PathBuf,
        /// Media type recorded in the frame metadata
        #[arg(short, long, default_value = "application/octet-stream")]
        media_type: String,
        /// Write the slot sequence as a JSON manifest
        #[arg(short = 'o', long)]
        manifest: Option<PathBuf>,
        /// Emit the legacy fixed-width length field (wire revision 1)
        #[arg(long)]
        legacy: bool,
    },
    /// Decode a JSON slot manifest back into the original file
    Unpack {
        manifest: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Show descriptors and attachment sizes for a manifest
    Info {
        manifest: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    match Cli::parse().command {

        // ── Pack ─────────────────────────────────────────────────────────────
        Commands::Pack { input, media_type, manifest, legacy } => {
            let data = std::fs::read(&input)?;
            let name = input.file_name().unwrap().to_string_lossy().into_owned();
            let crc = checksum(&data);
            let descriptor = MediaDescriptor::new(&media_type)
                .with_param("n", &name)
                .with_checksum(crc);
            let version = if legacy { WireVersion::V1 } else { WireVersion::V2 };

            println!("Packing '{}' ...", input.display());
            let start = Instant::now();
            let slots = encode(&data, &[descriptor], version)?;
            println!("  done (took {:.2}ms)", start.elapsed().as_secs_f64() * 1e3);

            let encoded_size: usize = slots.iter().map(Slot::width).sum();
            println!("  checksum: {crc}");
            println!("  stats:");
            println!("   - original size:   {}", data.len());
            println!("   - ManageData rows: {}", slots.len());
            println!("   - encoded size:    {encoded_size}");
            println!("   - ratio:           {:.2}x", encoded_size as f64 / data.len() as f64);

            if let Some(path) = manifest {
                std::fs::write(&path, serde_json::to_string_pretty(&slots)?)?;
                println!("Manifest: {}", path.display());
            }
        }

        // ── Unpack ───────────────────────────────────────────────────────────
        Commands::Unpack { manifest, output } => {
            let slots: Vec<Slot> = serde_json::from_str(&std::fs::read_to_string(&manifest)?)?;
            let (descriptors, attachments) = decode(&slots)?;
            let Some(data) = attachments.first() else {
                return Err("manifest carries no attachments".into());
            };
            std::fs::write(&output, data)?;
            match descriptors.first() {
                Some(d) => println!("Wrote {} ({} bytes, {})", output.display(), data.len(), d.type_subtype),
                None    => println!("Wrote {} ({} bytes)", output.display(), data.len()),
            }
        }

        // ── Info ─────────────────────────────────────────────────────────────
        Commands::Info { manifest } => {
            let slots: Vec<Slot> = serde_json::from_str(&std::fs::read_to_string(&manifest)?)?;
            let (descriptors, attachments) = decode(&slots)?;
            println!("Slots:       {}", slots.len());
            println!("Attachments: {}", attachments.len());
            for (descriptor, attachment) in descriptors.iter().zip(&attachments) {
                print!("  {} ({} bytes)", descriptor.type_subtype, attachment.len());
                for (key, value) in &descriptor.params {
                    print!("  {key}={value}");
                }
                println!();
            }
        }
    }

    Ok(())
}
