use std::hint::black_box;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use mnasolve::{Analysis, Arrow, Equation, Expr, MathFn, SolutionSet, StandardLog, solve};

const NUM_ITERS_BENCHMARK: u32 = 100;

/// One of the circuits built into this CLI; there is no netlist parser, so circuits
/// are picked by name rather than read from a file (see the `mnasolve` crate docs).
#[derive(Clone, Copy, ValueEnum)]
enum Circuit {
    /// A plain two-resistor divider: one linear unknown, no Newton block.
    ResistorDivider,
    /// An RC low-pass filter: one differential unknown, discretized to a single
    /// closed-form update.
    RcLowPass,
    /// An RC low-pass feeding a diode: the capacitor node stays linear, the diode
    /// node needs a Newton block.
    DiodeClipper,
}

#[derive(Parser)]
#[command(name = "mnasolve", version, about, long_about = None)]
struct Cli {
    /// Which built-in circuit to compile.
    circuit: Circuit,

    /// Simulation timestep, in seconds.
    #[arg(short = 't', long, default_value_t = 1.0 / 48000.0)]
    timestep: f64,

    /// Skip DC initial-condition analysis.
    #[arg(long = "no-initial-conditions")]
    no_initial_conditions: bool,

    /// Also report average compile time over a short benchmark loop.
    #[arg(long)]
    benchmark: bool,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    if let Err(err) = run(&cli) {
        eprintln!("{}", colored_error(&err));
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), mnasolve::CompileError> {
    let analysis = build_circuit(cli.circuit);
    let h = Expr::constant(cli.timestep);
    let log = StandardLog;

    let solution = solve(&analysis, &h, !cli.no_initial_conditions, &log)?;
    print_solution(&solution);

    if cli.benchmark {
        let now = std::time::Instant::now();
        for _ in 0..NUM_ITERS_BENCHMARK {
            black_box(solve(&analysis, &h, !cli.no_initial_conditions, &log))?;
        }
        print_benchmark(now.elapsed());
    }

    Ok(())
}

fn build_circuit(circuit: Circuit) -> Analysis {
    match circuit {
        Circuit::ResistorDivider => resistor_divider(),
        Circuit::RcLowPass => rc_low_pass(),
        Circuit::DiodeClipper => diode_clipper(),
    }
}

/// KCL at node n: (Vn - V)/R1 + Vn/R2 = 0.
fn resistor_divider() -> Analysis {
    let vn = Expr::symbol("Vn");
    let v = Expr::symbol("V");
    let r1 = Expr::symbol("R1");
    let r2 = Expr::symbol("R2");
    let residual = vn.sub(&v).div(&r1).add(&vn.div(&r2));
    Analysis::new(vec![Equation::new(residual, Expr::zero())], vec![vn])
        .with_initial_conditions_hint(vec![Arrow::new(v, Expr::zero())])
}

/// KCL at node n: (Vn - V)/R + C*dVn/dt = 0.
fn rc_low_pass() -> Analysis {
    let vn = Expr::symbol("Vn");
    let v = Expr::symbol("V");
    let r = Expr::symbol("R");
    let c = Expr::symbol("C");
    let t = Expr::t();
    let dvndt = Expr::d_dt(&vn, &t);
    let residual = vn.sub(&v).div(&r).add(&c.mul(&dvndt));
    Analysis::new(vec![Equation::new(residual, Expr::zero())], vec![vn])
        .with_initial_conditions_hint(vec![Arrow::new(v, Expr::zero())])
}

/// An RC low-pass node feeding a diode node through another resistor; the diode
/// current is the textbook `Is * (exp(Vd / Vt) - 1)`.
fn diode_clipper() -> Analysis {
    let vc = Expr::symbol("Vc");
    let vd = Expr::symbol("Vd");
    let v = Expr::symbol("V");
    let r = Expr::symbol("R");
    let c = Expr::symbol("C");
    let is = Expr::symbol("Is");
    let vt = Expr::symbol("Vt");
    let t = Expr::t();

    let dvcdt = Expr::d_dt(&vc, &t);
    let capacitor_eq = vc.sub(&v).div(&r).add(&c.mul(&dvcdt));

    let diode_current = is.mul(&Expr::call(MathFn::Exp, &vd.div(&vt)).sub(&Expr::one()));
    let diode_eq = vd.sub(&vc).div(&r).add(&diode_current);

    Analysis::new(
        vec![Equation::new(capacitor_eq, Expr::zero()), Equation::new(diode_eq, Expr::zero())],
        vec![vc, vd],
    )
}

fn print_solution(solution: &mnasolve::TransientSolution) {
    use colored::Colorize;

    println!("{}", "Solution stages:".bold());
    for (i, set) in solution.solutions().iter().enumerate() {
        match set {
            SolutionSet::LinearSolutions { assignments } => {
                println!("  [{i}] {}", "linear solutions".green());
                for arrow in assignments {
                    println!("        {arrow}");
                }
            }
            SolutionSet::NewtonIteration { linear_updates, jacobian, nonlinear_deltas, initial_guess } => {
                println!("  [{i}] {}", "Newton iteration".yellow());
                for arrow in linear_updates {
                    println!("        {arrow}  (linear update)");
                }
                for row in jacobian {
                    println!("        {} = 0  (Jacobian row)", row.to_expression());
                }
                let deltas = nonlinear_deltas
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                println!("        nonlinear deltas: [{deltas}]");
                for arrow in initial_guess {
                    println!("        initial guess: {arrow}");
                }
            }
        }
    }

    if solution.initial_conditions().is_empty() {
        println!("{}", "No DC initial conditions.".dimmed());
    } else {
        println!("{}", "DC initial conditions:".bold());
        for arrow in solution.initial_conditions() {
            println!("  {arrow}");
        }
    }
}

fn print_benchmark(elapsed: Duration) {
    use colored::Colorize;
    let per_iter = elapsed / NUM_ITERS_BENCHMARK;
    println!("Compiled in {}\u{3bc}s (mean over {NUM_ITERS_BENCHMARK} iterations)", per_iter.as_micros());
    let compiles_per_second = Duration::from_secs(1).as_micros() / per_iter.as_micros().max(1);
    let compiles_per_second = if compiles_per_second <= 60 {
        compiles_per_second.to_string().red()
    } else {
        compiles_per_second.to_string().normal()
    };
    println!("i.e. {compiles_per_second} compiles per second");
}

fn colored_error(err: &mnasolve::CompileError) -> String {
    use colored::Colorize;
    format!("{}: {err}", "Could not compile circuit".red())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resistor_divider_compiles() {
        let analysis = resistor_divider();
        let solution = solve(&analysis, &Expr::symbol("h"), true, &StandardLog).unwrap();
        assert_eq!(solution.solutions().len(), 1);
    }

    #[test]
    fn diode_clipper_compiles() {
        let analysis = diode_clipper();
        let solution = solve(&analysis, &Expr::constant(1.0 / 48000.0), false, &StandardLog).unwrap();
        assert_eq!(solution.solutions().len(), 2);
    }
}
