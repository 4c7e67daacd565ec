#[macro_use]
extern crate log;

mod utils;

use anyhow::Result;
use clap::{Parser, Subcommand};
use sangokushi::character::{self, ExtNames, Summary};
use sangokushi::generator::{self, Group, Selection};
use sangokushi::metatile::GridDisplay;
use sangokushi::mob::{self, COMPONENT_FIELDS};
use sangokushi::rom::DEFAULT_ROM_PATH;
use sangokushi::tile::PORTRAIT;
use sangokushi::{Rom, explorer, kanji, matcher, names, portrait};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "sgs-multitool",
    version = "1.0",
    about = "Extract tables and graphics from the Sangokushi Famicom cartridge"
)]
struct Cli {
    /// Enables verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// The iNES image to read
    #[arg(short, long, global = true, default_value = DEFAULT_ROM_PATH)]
    rom: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Dumps the general stat table to CSV
    Characters {
        /// Spreadsheet export used to fill in the names of the generals
        #[arg(long, default_value = character::EXT_CSV_PATH)]
        ext_csv: PathBuf,

        /// Directory receiving `<rom>_characters_v2.csv` and `.xlsx`
        #[arg(short, long, default_value = "output")]
        output: PathBuf,
    },
    /// Renders the 16x16 kanji used in the name table
    Kanji {
        #[arg(short, long, default_value = "kanji_output")]
        output: PathBuf,
    },
    /// Renders the named portraits P00-P80
    Portraits {
        #[arg(short, long, default_value = "kanji_output")]
        output: PathBuf,

        #[arg(short, long, default_value_t = 2)]
        scale: usize,
    },
    /// Dumps the component indices of the generic portraits
    MobComponents {
        #[arg(short, long, default_value = "output/mob_component_index.csv")]
        output: PathBuf,
    },
    /// Renders the generic portraits P081-P254
    MobPortraits {
        /// Table written by `characters`, used to name the files. Defaults to the one next to
        /// the other outputs.
        #[arg(long)]
        characters: Option<PathBuf>,

        #[arg(short, long, default_value_t = 2)]
        scale: usize,

        /// Defaults to `output/mob_portraits` or `output/mob_portraits_48` at scale 1
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Builds a portrait from a tile group and variant numbers
    Generate {
        /// Tile group, A to G
        group: Group,

        eye: i32,

        face: i32,

        mouth: i32,

        /// Framework index within the group
        #[arg(short, long, default_value_t = 0)]
        framework: usize,

        #[arg(short, long, default_value = "generated_portrait.png")]
        output: PathBuf,

        #[arg(short, long, default_value_t = 8)]
        scale: usize,
    },
    /// Finds the ROM tiles making up a portrait screenshot
    MatchLayout {
        /// Screenshot, 48x48 or any upscale of it
        screenshot: PathBuf,

        /// Tile group, A to H
        group: Group,

        /// Label for the report, e.g. P081
        #[arg(long)]
        portrait_id: Option<String>,
    },
    /// Finds the framework and variants of generic portrait screenshots
    MatchComponents {
        /// Screenshots to analyse, named after the general
        #[arg(required = true)]
        screenshots: Vec<PathBuf>,
    },
    /// Generates the variant explorer assets and page
    Explorer {
        #[arg(long, default_value = explorer::DEFAULT_ASSET_DIR)]
        assets: PathBuf,

        #[arg(long, default_value = explorer::DEFAULT_HTML_PATH)]
        html: PathBuf,

        #[arg(short, long, default_value_t = explorer::DEFAULT_SCALE)]
        scale: usize,

        /// Only refresh the HTML page
        #[arg(long)]
        html_only: bool,
    },
}

fn load_rom(path: &Path) -> Result<Rom> {
    let rom = Rom::from_path(path)?;

    info!(
        "Loaded `{}`: {}, {} PRG banks, mapper {}",
        path.display(),
        utils::format_size(rom.len() as u64),
        rom.prg_banks(),
        rom.mapper()
    );

    Ok(rom)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let rom = load_rom(&cli.rom)?;

    match cli.command {
        Commands::Characters { ext_csv, output } => {
            let ext = ExtNames::from_path(&ext_csv);
            let chars = character::decode_all(&rom, &ext);

            let path = output.join(character::csv_file_name(&cli.rom));
            character::export_csv(&chars, &path)?;

            let xlsx_path = output.join(character::xlsx_file_name(&cli.rom));
            character::export_xlsx(&chars, &xlsx_path)?;

            let s = Summary::of(&chars);

            println!("{} generals ({} named from the external sheet)", s.total, s.named);
            println!("  navy:    {}", s.navy);
            println!("  leaders: {}", s.leaders);
            println!();

            for c in chars.iter().take(10) {
                println!(
                    "{:3} {:<6} {:<8} age {:3} int {:3} war {:3} cha {:3} {}",
                    c.index,
                    c.ext_name,
                    c.rom_kana,
                    c.age,
                    c.intelligence,
                    c.military,
                    c.charisma,
                    character::faction_name(c.faction).unwrap_or("-")
                );
            }

            println!();
            println!("Wrote {}", path.display());
            println!("Wrote {}", xlsx_path.display());
        }
        Commands::Kanji { output } => {
            let stats = kanji::export(&rom, &output)?;

            println!("Known samples:  {}", stats.samples);
            println!("Page 0 glyphs:  {}", stats.page0);
            println!("Other pages:    {}", stats.other_pages);
            println!("Wrote {}", output.display());
        }
        Commands::Portraits { output, scale } => {
            let portraits = portrait::export(&rom, &output, scale)?;

            let standard = portraits.standard_count();

            println!("{} portraits", portraits.pointers.len());
            println!("  36 tile standard: {}", standard);
            println!("  other:            {}", portraits.pointers.len() - standard);
            println!("  mapped:           {}", portraits.mapping.len());
            println!("Wrote {}", output.display());
        }
        Commands::MobComponents { output } => {
            let records = mob::read_components(&rom);
            let by_portrait = mob::portrait_to_chars(&names::read_all(&rom));

            println!(
                "{:>5}  {:>9}  {:>3}  {:>4}  {:>3}  {:>4}  {:>5}  Characters",
                "P_ID", "Offset", "Cat", "Head", "Eye", "Nose", "Mouth"
            );

            for r in &records {
                let chars = by_portrait
                    .get(&(r.portrait_index as i16))
                    .map(|c| {
                        c.iter()
                            .map(|i| i.to_string())
                            .collect::<Vec<_>>()
                            .join(",")
                    })
                    .unwrap_or_default();

                println!(
                    "P{:03}  {:>9}  {:>3}  {:>4}  {:>3}  {:>4}  {:>5}  {}",
                    r.portrait_index, r.rom_offset, r.cat, r.head, r.eye, r.nose, r.mouth, chars
                );
            }

            println!();
            println!("Value distribution:");

            for (name, dist) in COMPONENT_FIELDS.iter().zip(mob::value_distribution(&records)) {
                print_distribution(name, &dist);
            }

            mob::export_component_csv(&records, &output)?;

            println!();
            println!("Wrote {}", output.display());
        }
        Commands::MobPortraits {
            characters,
            scale,
            output,
        } => {
            let csv_path = characters
                .unwrap_or_else(|| Path::new("output").join(character::csv_file_name(&cli.rom)));

            let names = match character::read_csv(&csv_path) {
                Ok(rows) => mob::portrait_names(&rows),
                Err(e) => {
                    warn!("No names for the portraits: {:#}", e);
                    BTreeMap::new()
                }
            };

            let output = output.unwrap_or_else(|| PathBuf::from(mob::default_portrait_dir(scale)));

            let written = mob::export_portraits(&rom, &names, &output, scale)?;

            println!(
                "{} portraits ({} named) at {}x to {}",
                written,
                names.len(),
                scale,
                output.display()
            );
        }
        Commands::Generate {
            group,
            eye,
            face,
            mouth,
            framework,
            output,
            scale,
        } => {
            let sel = Selection {
                group,
                framework,
                eye,
                face,
                mouth,
            };

            let (layout, img) = generator::generate(&rom, &sel)?;

            println!(
                "Group {} (base 0x{:X}, offset {}), framework `{}`",
                group,
                group.base(),
                group.offset(),
                group.framework(framework).name
            );
            println!("eye {}, face {}, mouth {}", eye, face, mouth);

            let cells = layout.map(|row| row.map(Some));
            print!("{}", GridDisplay(&cells));

            img.to_rgb(&PORTRAIT).scale(scale).write_png(&output)?;

            println!("Wrote {}", output.display());
        }
        Commands::MatchLayout {
            screenshot,
            group,
            portrait_id,
        } => {
            let shot = matcher::load_screenshot(&screenshot)?;
            let m = matcher::match_layout(&rom, group, &shot);

            if let Some(id) = portrait_id {
                println!("# {}", id);
            }

            print!("{}", m);
        }
        Commands::MatchComponents { screenshots } => {
            let mut results = Vec::with_capacity(screenshots.len());

            for path in &screenshots {
                let name = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();

                let shot = matcher::load_screenshot(path)?;
                let m = matcher::match_components(&rom, &name, &shot);

                println!("{}", m);

                results.push(m);
            }

            print!("{}", matcher::known_combinations_js(&results)?);
        }
        Commands::Explorer {
            assets,
            html,
            scale,
            html_only,
        } => {
            if !html_only {
                let stats = explorer::export_assets(&rom, &assets, scale)?;

                println!(
                    "{} tiles, {} frameworks, {} variants in {}",
                    stats.tiles,
                    stats.frameworks,
                    stats.variants,
                    assets.display()
                );
            }

            explorer::write_html(&rom, &html)?;

            let size = std::fs::metadata(&html)?.len();

            println!("Wrote {} ({})", html.display(), utils::format_size(size));
        }
    }

    Ok(())
}

fn print_distribution(name: &str, dist: &BTreeMap<u8, usize>) {
    let (Some(min), Some(max)) = (dist.keys().next(), dist.keys().next_back()) else {
        println!("  {:5}: -", name);
        return;
    };

    let counts: Vec<String> = dist.iter().map(|(v, n)| format!("{}:{}", v, n)).collect();

    println!("  {:5}: {}-{}, {}", name, min, max, counts.join(" "));
}
