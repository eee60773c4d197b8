use benchmark_simple::*;
use jwt_keygen::prelude::*;

fn main() {
    let bench = Bench::new();

    let options = &Options {
        iterations: 1000,
        warmup_iterations: 100,
        min_samples: 5,
        max_samples: 10,
        max_rsd: 1.0,
        ..Default::default()
    };

    let res = bench.run(options, || generate_secret(512).unwrap());
    println!("hmac-512 - secret: {}", res.throughput(1));

    let secret = HmacSecret {
        algorithm: HmacAlgorithm::HS256,
        secret: generate_secret(256).unwrap(),
    };
    let builder = ExampleTokenBuilder::new();
    let res = bench.run(options, move || builder.build(&secret, 24).unwrap());
    println!("hs256 - example token: {}", res.throughput(1));

    #[cfg(feature = "asymmetric")]
    {
        let res = bench.run(options, || generate_ec().unwrap());
        println!("p256 - key pair: {}", res.throughput(1));
    }
}
