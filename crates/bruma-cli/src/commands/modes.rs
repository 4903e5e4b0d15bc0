//! Mode listing command.

use bruma_engine::Mode;

fn describe(mode: Mode) -> &'static str {
    match mode {
        Mode::Drone => "detuned oscillator pairs under slow filter drift",
        Mode::Environ => "noise excitation through resonant room modes",
        Mode::Memory => "granular playback of a live capture ring",
        Mode::Generative => "cellular-automaton-gated oscillator columns",
        Mode::Oracle => "hexagram-biased probabilistic drone",
        Mode::Khs => "long-form moment-sequenced partial field",
    }
}

pub fn run() -> anyhow::Result<()> {
    println!("Available Modes");
    println!("===============\n");
    for mode in Mode::ALL {
        println!("  {:<12} {}", mode.name(), describe(mode));
    }
    println!("\nUse with: bruma play --mode <name>");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_mode_has_a_description() {
        for mode in Mode::ALL {
            assert!(!describe(mode).is_empty());
        }
    }
}
