use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::process;
use std::time::Instant;

use clap::{Parser, Subcommand};
use memmap2::Mmap;

use bmpack::{
    deserialize_index, read_all, stream_summary, Compressor, Dictionary, Expander,
    FingerprintIndex,
};

// ── mmap helpers ─────────────────────────────────────────────────────────

/// Open a file and map it read-only. Returns `None` for an empty file,
/// which cannot be mapped.
fn mmap_open(path: &str) -> std::io::Result<(File, Option<Mmap>)> {
    let file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Ok((file, None));
    }
    // SAFETY: the mapping is read-only and the file is not written while
    // this process holds it.
    let mmap = unsafe { Mmap::map(&file)? };
    Ok((file, Some(mmap)))
}

// ── CLI types ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(about = "Dictionary compression using long common strings (Bentley-McIlroy)")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress input against a reference dictionary
    Compress {
        /// Reference dictionary file
        dictionary: String,

        /// Input file
        input: String,

        /// Output (compressed stream) file
        output: String,

        /// Load a serialized fingerprint index instead of rebuilding it
        #[arg(long)]
        index: Option<String>,

        /// Write the fingerprint index after compression
        #[arg(long)]
        save_index: Option<String>,

        /// Print diagnostic messages to stderr
        #[arg(long)]
        verbose: bool,
    },

    /// Reconstruct input from a compressed stream
    Expand {
        /// Reference dictionary file
        dictionary: String,

        /// Compressed stream file
        input: String,

        /// Output (reconstructed) file
        output: String,
    },

    /// Show record statistics for a compressed stream
    Info {
        /// Compressed stream file
        stream: String,
    },
}

// ── main ─────────────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Compress {
            dictionary,
            input,
            output,
            index,
            save_index,
            verbose,
        } => {
            let (_dict_file, dict_map) = mmap_open(&dictionary).unwrap_or_else(|e| {
                eprintln!("Error reading {}: {}", dictionary, e);
                process::exit(1);
            });
            let dict_bytes: &[u8] = dict_map.as_deref().unwrap_or(&[]);

            let input_bytes = fs::read(&input).unwrap_or_else(|e| {
                eprintln!("Error reading {}: {}", input, e);
                process::exit(1);
            });

            let dict = match &index {
                Some(path) => {
                    let blob = fs::read(path).unwrap_or_else(|e| {
                        eprintln!("Error reading {}: {}", path, e);
                        process::exit(1);
                    });
                    let mut loaded = FingerprintIndex::new();
                    deserialize_index(&mut &blob[..], &mut loaded).unwrap_or_else(|e| {
                        eprintln!("Error decoding index {}: {}", path, e);
                        process::exit(1);
                    });
                    Dictionary::Indexed(dict_bytes.to_vec(), loaded)
                }
                None => Dictionary::Raw(dict_bytes.to_vec()),
            };

            let out_file = File::create(&output).unwrap_or_else(|e| {
                eprintln!("Error creating {}: {}", output, e);
                process::exit(1);
            });

            let t0 = Instant::now();
            let mut compressor = Compressor::new(BufWriter::new(out_file));
            compressor.attach_dictionary(dict);

            if verbose {
                let entries = compressor
                    .dictionary()
                    .and_then(Dictionary::index)
                    .map_or(0, FingerprintIndex::len);
                eprintln!(
                    "compress: |dict|={}, |input|={}, index entries={}{}",
                    dict_bytes.len(),
                    input_bytes.len(),
                    entries,
                    if index.is_some() { " (loaded)" } else { "" },
                );
            }

            compressor.write_all(&input_bytes).unwrap_or_else(|e| {
                eprintln!("Error buffering input: {}", e);
                process::exit(1);
            });
            compressor.finalize().unwrap_or_else(|e| {
                eprintln!("Error writing {}: {}", output, e);
                process::exit(1);
            });
            let elapsed = t0.elapsed();

            if let Some(path) = &save_index {
                let index_file = File::create(path).unwrap_or_else(|e| {
                    eprintln!("Error creating {}: {}", path, e);
                    process::exit(1);
                });
                let mut index_sink = BufWriter::new(index_file);
                let written = compressor
                    .serialize_index(&mut index_sink)
                    .and_then(|n| index_sink.flush().map(|_| n).map_err(Into::into))
                    .unwrap_or_else(|e| {
                        eprintln!("Error writing {}: {}", path, e);
                        process::exit(1);
                    });
                if verbose {
                    eprintln!("compress: index saved to {} ({} bytes)", path, written);
                }
            }

            // Walk the stream we just wrote for the record breakdown.
            let stream_bytes = fs::read(&output).unwrap_or_else(|e| {
                eprintln!("Error reading {}: {}", output, e);
                process::exit(1);
            });
            let records = read_all(&mut &stream_bytes[..]).unwrap_or_else(|e| {
                eprintln!("Error decoding {}: {}", output, e);
                process::exit(1);
            });
            let stats = stream_summary(&records);

            println!("Dictionary:   {} ({} bytes)", dictionary, dict_bytes.len());
            println!("Input:        {} ({} bytes)", input, compressor.input_size());
            println!("Output:       {} ({} bytes)", output, compressor.output_size());
            println!(
                "Records:      {} references ({} bytes), {} literals ({} bytes)",
                stats.num_references,
                stats.reference_bytes,
                stats.num_literals,
                stats.literal_bytes
            );
            println!("Ratio:        {} (output/input, 1/10000)", compressor.ratio());
            println!("Time:         {:.3}s", elapsed.as_secs_f64());
        }

        Commands::Expand {
            dictionary,
            input,
            output,
        } => {
            let (_dict_file, dict_map) = mmap_open(&dictionary).unwrap_or_else(|e| {
                eprintln!("Error reading {}: {}", dictionary, e);
                process::exit(1);
            });
            let dict_bytes: &[u8] = dict_map.as_deref().unwrap_or(&[]);

            let stream_file = File::open(&input).unwrap_or_else(|e| {
                eprintln!("Error reading {}: {}", input, e);
                process::exit(1);
            });

            let t0 = Instant::now();
            let expander = Expander::new(BufReader::new(stream_file), dict_bytes);
            let out_bytes = expander.expand().unwrap_or_else(|e| {
                eprintln!("Error expanding {}: {}", input, e);
                process::exit(1);
            });
            let elapsed = t0.elapsed();

            fs::write(&output, &out_bytes).unwrap_or_else(|e| {
                eprintln!("Error writing {}: {}", output, e);
                process::exit(1);
            });

            println!("Dictionary:   {} ({} bytes)", dictionary, dict_bytes.len());
            println!("Stream:       {}", input);
            println!("Output:       {} ({} bytes)", output, out_bytes.len());
            println!("Time:         {:.3}s", elapsed.as_secs_f64());
        }

        Commands::Info { stream } => {
            let stream_bytes = fs::read(&stream).unwrap_or_else(|e| {
                eprintln!("Error reading {}: {}", stream, e);
                process::exit(1);
            });

            let records = read_all(&mut &stream_bytes[..]).unwrap_or_else(|e| {
                eprintln!("Error decoding {}: {}", stream, e);
                process::exit(1);
            });

            let stats = stream_summary(&records);
            println!("Stream:       {} ({} bytes)", stream, stream_bytes.len());
            println!("Records:      {}", stats.num_records);
            println!(
                "  References: {} ({} bytes)",
                stats.num_references, stats.reference_bytes
            );
            println!(
                "  Literals:   {} ({} bytes)",
                stats.num_literals, stats.literal_bytes
            );
            println!("Output size:  {} bytes", stats.total_output_bytes);
        }
    }
}
