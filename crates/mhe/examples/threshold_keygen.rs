// Threshold key generation and collective key switching with the `mhe` crate.
//
// N parties generate a collective public key, turn their additive secrets
// into t-out-of-N Shamir shares, and any t of them then generate a
// relinearization key and re-encrypt a ciphertext to an external receiver.

use std::{env, error::Error, process::exit, time::Instant};

use console::style;
use mhe::{
    mhe::{
        AggregateIter, Combiner, KeySwitchProtocol, KeySwitchTarget, KeySwitchTargetKey,
        PublicKeyGenProtocol, RelinearizationKeyGenProtocol, Seed, ShamirPublicPoint,
        ShamirSecretShare, Thresholdizer,
    },
    rlwe::{noise::log2_std, Ciphertext, GadgetShape, ParametersBuilder, PublicKey, RelinearizationKey, SecretKey},
};
use mhe_math::rq::{Poly, Representation};
use mhe_traits::{FheDecrypter, FheEncrypter};
use rand::{thread_rng, Rng};
use rayon::prelude::*;

macro_rules! timeit {
    ($name:expr, $code:expr) => {{
        let start = Instant::now();
        let r = $code;
        println!("⏱  {}: {:?}", $name, start.elapsed());
        r
    }};
}

fn print_notice_and_exit(error: Option<String>) {
    println!(
        "{} Threshold key generation",
        style("  overview:").magenta().bold()
    );
    println!(
        "{} threshold_keygen [-h] [--help] [--num_parties=<value>] [--threshold=<value>]",
        style("     usage:").magenta().bold()
    );
    println!(
        "{} {} must be at least 1 and {} between 1 and {}",
        style("constraints:").magenta().bold(),
        style("num_parties").blue(),
        style("threshold").blue(),
        style("num_parties").blue(),
    );
    if let Some(error) = error {
        println!("{} {}", style("     error:").red().bold(), error);
    }
    exit(0);
}

fn main() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = env::args().skip(1).collect();
    if args.contains(&"-h".to_string()) || args.contains(&"--help".to_string()) {
        print_notice_and_exit(None)
    }

    let mut num_parties = 5;
    let mut threshold = 3;
    for arg in &args {
        let parts: Vec<&str> = arg.rsplit('=').collect();
        let value = if parts.len() == 2 {
            parts[0].parse::<usize>().ok()
        } else {
            None
        };
        match (arg.split('=').next(), value) {
            (Some("--num_parties"), Some(v)) => num_parties = v,
            (Some("--threshold"), Some(v)) => threshold = v,
            (Some("--num_parties"), None) | (Some("--threshold"), None) => {
                print_notice_and_exit(Some(format!("Invalid argument: {arg}")))
            }
            _ => print_notice_and_exit(Some(format!("Unrecognized argument: {arg}"))),
        }
    }
    if let Err(e) = mhe::mhe::validate_threshold_config(num_parties, threshold) {
        print_notice_and_exit(Some(e.to_string()))
    }

    println!("# Threshold key generation");
    println!("\tnum_parties = {num_parties}");
    println!("\tthreshold = {threshold}");

    let par = timeit!(
        "Parameters generation",
        ParametersBuilder::new()
            .set_degree(4096)
            .set_moduli_sizes(&[50, 50, 50])
            .set_p_moduli_sizes(&[55, 55])
            .build_arc()?
    );
    let (level_q, level_p) = (par.max_level_q(), par.max_level_p());
    let mut rng = thread_rng();

    // Every party samples its additive share of the ideal secret.
    let secret_keys = (0..num_parties)
        .map(|_| SecretKey::random(&par, &mut rng))
        .collect::<Result<Vec<_>, _>>()?;

    // Collective public key, one protocol instance per worker.
    let mut seed = Seed::default();
    rng.fill(&mut seed);
    let pk_protocol = PublicKeyGenProtocol::new(&par);
    let pk = timeit!("Collective public key", {
        let share = secret_keys
            .par_iter()
            .map(|sk| {
                let mut protocol = pk_protocol.shallow_copy();
                let mut share = protocol.allocate_share(level_q, level_p)?;
                protocol.gen_share(sk, seed, &mut share)?;
                Ok(share)
            })
            .collect::<mhe::Result<Vec<_>>>()?
            .into_iter()
            .aggregate()?;
        let mut pk = PublicKey::allocate(&par, level_q, level_p)?;
        pk_protocol.finalize(&share, &mut pk)?;
        pk
    });

    // Shamir sharing of the additive secrets.
    let points = (1..=num_parties as u64)
        .map(ShamirPublicPoint)
        .collect::<Vec<_>>();
    let thresholdizer = Thresholdizer::new(&par);
    let threshold_shares: Vec<ShamirSecretShare> = timeit!("Shamir sharing", {
        let polynomials = secret_keys
            .iter()
            .map(|sk| thresholdizer.gen_shamir_polynomial(threshold, sk, &mut thread_rng()))
            .collect::<mhe::Result<Vec<_>>>()?;
        points
            .par_iter()
            .map(|point| {
                polynomials
                    .iter()
                    .map(|poly| thresholdizer.gen_shamir_secret_share(*point, poly))
                    .collect::<mhe::Result<Vec<_>>>()?
                    .into_iter()
                    .aggregate()
            })
            .collect::<mhe::Result<Vec<_>>>()?
    });

    // Any `threshold` parties recover additive shares of the ideal secret.
    let active = &points[num_parties - threshold..];
    let active_keys = timeit!("Combination", {
        active
            .iter()
            .map(|point| {
                let index = (point.0 - 1) as usize;
                let combiner = Combiner::new(&par, *point, &points, threshold)?;
                combiner.finalize(active, *point, &threshold_shares[index])
            })
            .collect::<mhe::Result<Vec<_>>>()?
    });

    let shape = GadgetShape::new(level_q, level_p, 0);
    let rlk_protocol = RelinearizationKeyGenProtocol::new(&par);
    let _rlk = timeit!("Relinearization key", {
        let share = active_keys
            .par_iter()
            .map(|sk| {
                let mut protocol = rlk_protocol.shallow_copy();
                let mut share = protocol.allocate_share(shape)?;
                protocol.gen_share(sk, &pk, &mut share)?;
                Ok(share)
            })
            .collect::<mhe::Result<Vec<_>>>()?
            .into_iter()
            .aggregate()?;
        let mut rlk = RelinearizationKey::allocate(&par, shape)?;
        rlk_protocol.finalize(&share, &mut rlk)?;
        rlk
    });

    // Re-encryption of a ciphertext under the collective key to a receiver.
    let receiver = SecretKey::random(&par, &mut rng)?;
    let mut receiver_pk = PublicKey::allocate(&par, level_q, None)?;
    {
        let mut protocol = PublicKeyGenProtocol::new(&par);
        let mut share = protocol.allocate_share(level_q, None)?;
        let mut receiver_seed = Seed::default();
        rng.fill(&mut receiver_seed);
        protocol.gen_share(&receiver, receiver_seed, &mut share)?;
        protocol.finalize(&share, &mut receiver_pk)?;
    }
    let m = Poly::random(par.ctx_q(), level_q, Representation::Ntt, &mut rng);
    let ct: Ciphertext = pk.try_encrypt(&m, &mut rng)?;
    let ks_protocol = KeySwitchProtocol::new(&par, KeySwitchTarget::PublicKey, 1024.0)?;
    let ct_out = timeit!("Collective key switch", {
        let share = active_keys
            .par_iter()
            .map(|sk| {
                let mut protocol = ks_protocol.shallow_copy();
                let mut share = protocol.allocate_share(level_q)?;
                protocol.gen_share(
                    sk,
                    KeySwitchTargetKey::PublicKey(&receiver_pk),
                    &ct,
                    &mut share,
                )?;
                Ok(share)
            })
            .collect::<mhe::Result<Vec<_>>>()?
            .into_iter()
            .aggregate()?;
        ks_protocol.finalize(&ct, &share)?
    });

    let noise = &receiver.try_decrypt(&ct_out)? - &m;
    println!(
        "{} log2 of the noise standard deviation: {:.2}",
        style("result:").green().bold(),
        log2_std(&noise)?
    );
    Ok(())
}
