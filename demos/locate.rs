use std::error::Error;
use std::env::args;
use std::process;

use lpr_gate::annotate;
use lpr_gate::image_process::PlateLocalizer;
use lpr_gate::utils;

fn main() -> Result<(), Box<dyn Error>> {
    let mut args = args();
    args.next();
    let path = match args.next() {
        Some(path) => path,
        None => {
            eprintln!("didn't get a image from args");
            process::exit(1);
        }
    };

    let img = image::open(&path)?;
    let localizer = PlateLocalizer::default();
    let region = localizer.locate(&img);
    match region {
        Some(region) => {
            println!("plate at {:?}, {}x{}", region, region.width(), region.height());
            utils::apply_filter(&region.crop(&img)).save("plate_filtered.png")?;
        }
        None => println!("no plate found, ocr would read the whole image"),
    }
    localizer.edge_map(&img).save("edges.png")?;
    annotate(&img, region).save("located.png")?;
    Ok(())
}
