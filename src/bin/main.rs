use std::path::PathBuf;

use ctf_montage::Batch;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "ctf-montage",
    about = "Montages of cryo-EM micrographs with their CTFFIND4 fits"
)]
struct Opt {
    /// Path to the directory with the micrographs and the CTFFIND4 outputs
    #[structopt(short, long)]
    path: PathBuf,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let opt = Opt::from_args();

    let summary = Batch::default().data_path(&opt.path).run()?;
    println!("{summary}");

    Ok(())
}
