//! List XAR Signatures
//!
//! Prints every signature recorded in an archive's TOC.
//!
//! Usage:
//!   cargo run --bin xar_signatures -- archive.xar
//!   cargo run --bin xar_signatures -- archive.xar --dump
//!   cargo run --bin xar_signatures -- archive.xar --xml

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::process::ExitCode;
use xar_oxide::{Archive, ArchiveOptions};

struct ListConfig {
    path: Option<PathBuf>,
    dump: bool,
    xml: bool,
}

impl ListConfig {
    fn from_args() -> Self {
        let mut path = None;
        let mut dump = false;
        let mut xml = false;

        for arg in std::env::args().skip(1) {
            match arg.as_str() {
                "--dump" | "-d" => dump = true,
                "--xml" => xml = true,
                _ => path = Some(PathBuf::from(arg)),
            }
        }

        Self { path, dump, xml }
    }
}

fn hex_preview(bytes: &[u8], max: usize) -> String {
    let mut out: String = bytes
        .iter()
        .take(max)
        .map(|b| format!("{:02x}", b))
        .collect();
    if bytes.len() > max {
        out.push_str("...");
    }
    out
}

fn run(config: &ListConfig) -> Result<(), Box<dyn std::error::Error>> {
    let Some(path) = config.path.as_ref() else {
        eprintln!("Usage: xar_signatures <archive.xar> [--dump] [--xml]");
        return Ok(());
    };

    let file = File::open(path)?;
    let mut archive = Archive::open(BufReader::new(file), ArchiveOptions::default())?;

    println!("{}", path.display());
    println!("  TOC: {} bytes compressed", archive.toc_length());
    println!("  Signatures: {}", archive.signatures().len());

    for index in 0..archive.signatures().len() {
        let sig = archive.signatures().require(index)?;
        println!(
            "  #{} style={} offset={} size={} certificates={}",
            index,
            sig.style(),
            sig.offset(),
            sig.length(),
            sig.certificate_count()
        );
        for (i, cert) in sig.certificates().iter().enumerate() {
            println!("      cert[{}]: {} bytes", i, cert.len());
        }

        if config.dump {
            match archive.copy_signed_data(index) {
                Ok(data) => {
                    println!("      digest:    {}", hex_preview(&data.digest, 32));
                    println!("      signature: {}", hex_preview(&data.signature, 32));
                },
                Err(e) => println!("      signed data unavailable: {}", e),
            }
        }
    }

    if config.xml {
        println!("{}", archive.serialize_signatures()?);
    }

    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    let config = ListConfig::from_args();
    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        },
    }
}
