use std::env;
use std::io;
use std::io::Write;
use std::process;

use tracing_subscriber::EnvFilter;

use headchart::word::Sentence;
use headchart::{Decoded, Decoder, Err, Settings, TableOracle, TreebankPolicy};

fn usage(prog_name: &str) -> String {
  format!(
    r"Usage: {} MODEL [options]

Reads one sentence per line from stdin. Words may carry a tag as word/TAG.

Options:
  -h, --help               Print this message
  -s, --settings FILE      Decoder settings (defaults to built-in settings)
  -c, --chart              Print the chart after each sentence (defaults to not printing)",
    prog_name
  )
}

struct Args {
  model: String,
  settings: Option<String>,
  print_chart: bool,
}

impl Args {
  fn make_error_message(msg: &str, prog_name: impl AsRef<str>) -> String {
    format!("argument error: {}.\n\n{}", msg, usage(prog_name.as_ref()))
  }

  fn parse(v: Vec<String>) -> Result<Self, String> {
    if v.is_empty() {
      return Err(Self::make_error_message("bad argument vector", "cli"));
    }

    let args_len = v.len();
    let mut iter = v.into_iter();
    let prog_name = iter.next().unwrap();

    if args_len < 2 {
      return Err(Self::make_error_message("not enough arguments", prog_name));
    }

    let mut model: Option<String> = None;
    let mut settings: Option<String> = None;
    let mut print_chart = false;

    while let Some(o) = iter.next() {
      if o == "-h" || o == "--help" {
        println!("{}", usage(&prog_name));
        process::exit(0);
      } else if o == "-c" || o == "--chart" {
        print_chart = true;
      } else if o == "-s" || o == "--settings" {
        match iter.next() {
          Some(file) => settings = Some(file),
          None => return Err(Self::make_error_message("missing settings file", prog_name)),
        }
      } else if model.is_none() {
        model = Some(o);
      } else {
        return Err(Self::make_error_message("invalid arguments", prog_name));
      }
    }

    if let Some(model) = model {
      Ok(Self {
        model,
        settings,
        print_chart,
      })
    } else {
      Err(Self::make_error_message("missing model file", prog_name))
    }
  }
}

fn parse(
  decoder: &mut Decoder<'_, TableOracle, TreebankPolicy>,
  oracle: &TableOracle,
  lang: &TreebankPolicy,
  line: &str,
  print_chart: bool,
) -> Result<(), Err> {
  let words = line.split_whitespace().collect::<Vec<_>>();
  let sentence = Sentence::from_words(oracle.symbols(), lang, &words)?;

  let decoded = decoder.decode(sentence);

  if print_chart {
    println!("chart:\n{}", decoder.chart().display(oracle.symbols()));
  }

  match decoded {
    Decoded::Parse(d) => {
      println!("{}", d.resolve(oracle.symbols()).to_bracketed());
      println!("score: {:.4}", d.score);
    }
    Decoded::NoParse(_) => println!("no parse"),
  }
  println!();

  Ok(())
}

fn main() -> Result<(), Err> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .with_writer(io::stderr)
    .init();

  let opts = match Args::parse(env::args().collect()) {
    Ok(opts) => opts,
    Err(msg) => {
      eprintln!("{}", msg);
      process::exit(255);
    }
  };

  let settings = match &opts.settings {
    Some(file) => Settings::read_from_file(file)?,
    None => Settings::default(),
  };
  let oracle = TableOracle::read_from_file(&opts.model, settings.subcat)?;
  let lang = TreebankPolicy::new(oracle.symbols());
  let mut decoder = Decoder::new(&oracle, &lang, settings);

  let mut input = String::new();
  loop {
    print!("> ");
    io::stdout().flush()?;

    match io::stdin().read_line(&mut input) {
      Ok(_) => {
        if input.is_empty() {
          // ctrl+d
          return Ok(());
        }
        if let Err(e) = parse(&mut decoder, &oracle, &lang, input.trim(), opts.print_chart) {
          eprintln!("error: {}", e);
        }
        input.clear();
      }
      Err(error) => return Err(error.into()),
    }
  }
}
