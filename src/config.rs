use clap::Parser;
use clap_num::maybe_hex;
use lazy_static::lazy_static;

#[derive(Parser, Debug)]
#[command(author,version,about,long_about=None)]
pub struct Args {
    /// Trace file to replay (one line of register/memory assignments per instruction)
    pub file: String,

    /// Run the whole trace without the interactive prompt (stops early on a watchpoint hit)
    #[arg(short, long)]
    pub batch: bool,

    /// Base address of guest memory (hex ok with '0x')
    #[arg(long,value_parser=maybe_hex::<u32>, default_value_t=0x8000_0000_u32)]
    pub mem_base: u32,

    /// Size of guest memory in bytes (hex ok with '0x')
    #[arg(long,value_parser=maybe_hex::<u32>, default_value_t=0x1_0000_u32)]
    pub mem_size: u32,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

lazy_static! {
    pub static ref ARGS: Args = if cfg!(test) {
        // manually set parameters for running tests
        Args::parse_from(["test", "test"])
    } else {
        Args::parse()
    };
}

pub fn init() { lazy_static::initialize(&ARGS); }
pub fn batch() -> bool { ARGS.batch }
