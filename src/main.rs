use std::fs;
use std::io;
use std::path;
use std::process;

use bytesize::ByteSize;
use env_logger;
use log;

use byte_ext_sort::generator::RandomLineGenerator;
use byte_ext_sort::{ByteOrder, Comparator, Descending, ExternalSorterBuilder, LineChunker, OutputSink};

fn main() {
    let arg_parser = build_arg_parser();

    let log_level: log::LevelFilter = arg_parser.value_of_t_or_exit("log_level");
    init_logger(log_level);

    let descending = arg_parser.value_of("sort") == Some("desc");
    let tmp_dir: Option<&str> = arg_parser.value_of("tmp_dir");
    let memory_limit = arg_parser.value_of("memory_limit").expect("value is required");
    let rw_buf_size: Option<&str> = arg_parser.value_of("rw_buf_size");
    let generate: Option<u64> = arg_parser
        .is_present("generate")
        .then(|| arg_parser.value_of_t_or_exit("generate"));
    let line_length: usize = arg_parser.value_of_t_or_exit("line_length");

    let input = arg_parser.value_of("input").expect("value is required");
    if let Some(lines) = generate {
        log::info!("generating {} lines of {} characters into {}", lines, line_length, input);
        if let Err(err) = generate_input(input, lines, line_length) {
            log::error!("input file generation error: {}", err);
            process::exit(1);
        }
    }

    let input_stream = match fs::File::open(input) {
        Ok(file) => io::BufReader::new(file),
        Err(err) => {
            log::error!("input file opening error: {}", err);
            process::exit(1);
        }
    };

    let output = arg_parser.value_of("output").expect("value is required");
    let output_stream = match fs::File::create(output) {
        Ok(file) => io::BufWriter::new(file),
        Err(err) => {
            log::error!("output file creation error: {}", err);
            process::exit(1);
        }
    };

    let mut sorter_builder = ExternalSorterBuilder::new(
        memory_limit.parse::<ByteSize>().expect("value is pre-validated").as_u64(),
    );

    if let Some(tmp_dir) = tmp_dir {
        sorter_builder = sorter_builder.with_tmp_dir(path::Path::new(tmp_dir));
    }

    if let Some(rw_buf_size) = rw_buf_size {
        sorter_builder = sorter_builder
            .with_rw_buf_size(rw_buf_size.parse::<ByteSize>().expect("value is pre-validated").as_u64() as usize);
    }

    let comparator: Box<dyn Comparator> = if descending {
        Box::new(Descending(ByteOrder))
    } else {
        Box::new(ByteOrder)
    };
    let comparator = move |a: &[u8], b: &[u8]| comparator.less(a, b);

    let mut sorter = match sorter_builder.build(
        OutputSink::closable(output_stream),
        LineChunker::default(),
        comparator,
    ) {
        Ok(sorter) => sorter,
        Err(err) => {
            log::error!("sorter initialization error: {}", err);
            process::exit(1);
        }
    };

    match sorter.extend_from_reader(input_stream) {
        Ok(records) => log::info!("{} records accepted ({} runs spilled)", records, sorter.run_count()),
        Err(err) => {
            log::error!("data sorting error: {}", err);
            // the partial input must not be merged into the output, dropping the sorter removes its runs
            drop(sorter);
            process::exit(1);
        }
    }

    if let Err(err) = sorter.close() {
        log::error!("sorted data saving error: {}", err);
        process::exit(1);
    }

    log::info!("sorting finished, output file: {}", output);
}

fn generate_input(path: &str, lines: u64, line_length: usize) -> io::Result<()> {
    let mut output = io::BufWriter::new(fs::File::create(path)?);
    RandomLineGenerator::new(lines, line_length).generate(&mut output, &mut rand::thread_rng())?;
    output.get_ref().sync_all()
}

/// Log levels accepted by `--loglevel`, parsed into [`log::LevelFilter`].
const LOG_LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

/// Sorting orders accepted by `--sort`.
const ORDERS: [&str; 2] = ["asc", "desc"];

fn validate_size(v: &str) -> Result<(), String> {
    match v.parse::<ByteSize>() {
        Ok(_) => Ok(()),
        Err(err) => Err(format!("size format incorrect: {}", err)),
    }
}

fn build_arg_parser() -> clap::ArgMatches {
    clap::App::new("byte-ext-sort")
        .about("external sorter of delimited records")
        .arg(
            clap::Arg::new("input")
                .short('i')
                .long("input")
                .help("file to be sorted")
                .required(true)
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("output")
                .short('o')
                .long("output")
                .help("result file")
                .required(true)
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("sort")
                .short('s')
                .long("sort")
                .help("sorting order")
                .takes_value(true)
                .default_value("asc")
                .possible_values(ORDERS),
        )
        .arg(
            clap::Arg::new("log_level")
                .short('l')
                .long("loglevel")
                .help("logging level")
                .takes_value(true)
                .default_value("info")
                .possible_values(LOG_LEVELS),
        )
        .arg(
            clap::Arg::new("tmp_dir")
                .short('d')
                .long("tmp-dir")
                .help("directory to be used to store temporary data")
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("memory_limit")
                .short('m')
                .long("memory-limit")
                .help("memory limit of the in-memory buffer")
                .required(true)
                .takes_value(true)
                .validator(validate_size),
        )
        .arg(
            clap::Arg::new("rw_buf_size")
                .short('b')
                .long("rw-buf-size")
                .help("run file read/write buffer size")
                .takes_value(true)
                .validator(validate_size),
        )
        .arg(
            clap::Arg::new("generate")
                .short('g')
                .long("generate")
                .help("number of random lines to generate into the input file before sorting")
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("line_length")
                .short('L')
                .long("line-length")
                .help("length of generated lines")
                .takes_value(true)
                .default_value("30"),
        )
        .get_matches()
}

fn init_logger(log_level: log::LevelFilter) {
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp_millis()
        .init();
}
