use clap::{ Arg, ArgAction, Command };
use env_logger::Env;
use log::{ error, info };

use std::error::Error;
use std::fs;
use std::path::{ Path, PathBuf };
use std::process;

use lpr_gate::authorized::AuthorizedSet;
use lpr_gate::config::LprConfig;
use lpr_gate::error::LprError;
use lpr_gate::image_process::PlateLocalizer;
use lpr_gate::ocr::TesseractEngine;
use lpr_gate::{ annotate, list_images, FileImageSource, ImageSource, Lpr };


fn main() {
    let matches = Command::new("lpr-gate")
                    .version("0.1.0")
                    .about("Reads license plates from photos and checks them against an authorized list")
                    .arg(Arg::new("INPUT")
                        .help("image file or directory of images")
                        .required(true)
                        .index(1))
                    .arg(Arg::new("config")
                        .long("config")
                        .short('c')
                        .value_name("FILE")
                        .help("TOML or JSON configuration"))
                    .arg(Arg::new("authorized-csv")
                        .long("authorized-csv")
                        .value_name("FILE")
                        .help("CSV export of the authorized list"))
                    .arg(Arg::new("sheet-url")
                        .long("sheet-url")
                        .value_name("URL")
                        .help("published spreadsheet CSV export URL"))
                    .arg(Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("print the report as JSON"))
                    .arg(Arg::new("annotate")
                        .long("annotate")
                        .value_name("DIR")
                        .help("write copies of the inputs with the located plate boxed"))
                    .arg(Arg::new("verbose")
                        .long("verbose")
                        .short('v')
                        .action(ArgAction::SetTrue)
                        .help("debug logging"))
                    .get_matches();

    let level = if matches.get_flag("verbose") { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    if let Err(e) = run(&matches) {
        error!("{}", e);
        process::exit(1);
    }
}

fn run(matches: &clap::ArgMatches) -> Result<(), Box<dyn Error>> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => LprConfig::load(Path::new(path))?,
        None => LprConfig::default(),
    };
    if let Some(csv) = matches.get_one::<String>("authorized-csv") {
        config.authorized.csv_path = Some(PathBuf::from(csv));
    }
    if let Some(url) = matches.get_one::<String>("sheet-url") {
        config.authorized.sheet_url = Some(url.clone());
    }

    let input = PathBuf::from(matches.get_one::<String>("INPUT").ok_or("input is required")?);
    let paths = if input.is_dir() {
        list_images(&input, &config.extensions)?
    } else {
        vec![input]
    };
    if paths.is_empty() {
        info!("no images found");
        return Ok(());
    }

    // fetched once, shared read-only by every image of the run
    let authorized = AuthorizedSet::fetch(config.authorized.provider().as_ref());

    let lpr = Lpr::new(PlateLocalizer::new(config.localizer.clone()), TesseractEngine::new(config.ocr.clone()));
    let report = lpr.recognize_batch(&FileImageSource, &paths, &authorized);

    if matches.get_flag("json") {
        println!("{}", report.to_json()?);
    } else {
        println!("{}", report.render_table());
        println!();
        println!("{}", report.summary());
    }

    if let Some(dir) = matches.get_one::<String>("annotate") {
        write_annotations(&lpr, &paths, Path::new(dir))?;
    }
    Ok(())
}

fn write_annotations(lpr: &Lpr<TesseractEngine>, paths: &[PathBuf], dir: &Path) -> Result<(), LprError> {
    fs::create_dir_all(dir)?;
    for path in paths {
        let img = match FileImageSource.decode(path) {
            Some(img) => img,
            None => continue,
        };
        let region = lpr.localizer().locate(&img);
        let name = match path.file_stem() {
            Some(stem) => stem.to_string_lossy(),
            None => continue,
        };
        let out = dir.join(format!("{}_plate.png", name));
        annotate(&img, region).save(&out)?;
        info!("wrote {}", out.display());
    }
    Ok(())
}
