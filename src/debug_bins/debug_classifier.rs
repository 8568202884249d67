use clap::Parser;
use meterlink::registers::{
    classify, decode_registers, payload_text, total_harmonic_distortion, ClassifiedSample,
};
use meterlink::telemetry::synthetic::random_payload;
use rand::rngs::StdRng;
use rand::SeedableRng;

#[derive(Parser)]
#[command(name = "debug_classifier")]
#[command(about = "Run meter payloads through the register decoder and classifier", long_about = None)]
struct Args {
    /// Payloads to classify (bare lists or JSON envelopes)
    payloads: Vec<String>,

    /// Also classify this many synthetic payloads
    #[arg(short, long, default_value = "0")]
    synthetic: usize,

    /// Seed for synthetic payloads
    #[arg(long, default_value = "1")]
    seed: u64,

    /// Print the decoded registers and THD estimate
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();

    let mut payloads = args.payloads.clone();
    let mut rng = StdRng::seed_from_u64(args.seed);
    payloads.extend((0..args.synthetic).map(|_| random_payload(&mut rng)));

    if payloads.is_empty() {
        println!("No payloads given. Try: debug_classifier '[230,229,231]' --synthetic 10");
        return;
    }

    println!("Register Classifier Debug Tool\n");
    println!("{}", "=".repeat(80));

    let mut measurements = 0;
    for (i, payload) in payloads.iter().enumerate() {
        println!("\n[{}] {}", i + 1, payload);

        let text = match payload_text(payload) {
            Ok(text) => text,
            Err(e) => {
                println!("    envelope error: {}", e);
                continue;
            }
        };

        let registers = match decode_registers(&text) {
            Ok(registers) => registers,
            Err(e) => {
                println!("    decode error: {}", e);
                continue;
            }
        };

        if args.verbose {
            println!("    registers: {:?}", registers.values());
            if let Some(thd) = total_harmonic_distortion(registers.values()) {
                println!("    thd estimate: {:.2}%", thd);
            }
        }

        let sample = classify(&registers);
        if sample.is_measurement() {
            measurements += 1;
        }
        println!("    -> {}", describe(&sample));
    }

    println!("\n{}", "=".repeat(80));
    println!(
        "\n{} payloads, {} measurements, {} discarded",
        payloads.len(),
        measurements,
        payloads.len() - measurements
    );
}

fn describe(sample: &ClassifiedSample) -> String {
    match sample {
        ClassifiedSample::PowerFactor { value } => format!("power factor {:.3}", value),
        ClassifiedSample::Frequency { value } => format!("frequency {:.2} Hz", value),
        ClassifiedSample::PowerFactorAndThd { power_factor, thd } => {
            format!("power factor {:?}, thd {:?}", power_factor, thd)
        }
        ClassifiedSample::ThreePhaseVoltage(p) => {
            format!("voltage R={} Y={} B={} (avg {:.1})", p.r, p.y, p.b, p.average())
        }
        ClassifiedSample::ThreePhaseCurrent(p) => format!("current R={} Y={} B={}", p.r, p.y, p.b),
        ClassifiedSample::ActivePower { value } => format!("active power {} W", value),
        ClassifiedSample::Corrupt => "CORRUPT (discarded)".to_string(),
        ClassifiedSample::Unclassifiable => "UNCLASSIFIABLE (discarded)".to_string(),
    }
}
