// keyed_objectpool demo
// Replays the basic check-out/check-in cycle for two keys.
// Set RUST_LOG=keyed_objectpool=trace to see pool events.

use keyed_objectpool::{KeyedObjectPool, PoolConfiguration};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Type {
    A,
    B,
}

#[derive(Debug)]
struct MyObject {
    val: String,
}

impl MyObject {
    fn new(val: &str) -> Self {
        Self { val: val.to_string() }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let pool = KeyedObjectPool::with_configuration(PoolConfiguration::new().with_name("demo"));

    let type_a_allocator = || MyObject::new("A");
    let type_b_allocator = || MyObject::new("B");

    let a1 = pool.check_out(Type::A, &type_a_allocator);
    let a2 = pool.check_out(Type::A, &type_a_allocator);
    println!("a1 = a2 : {}", a1.val.as_ptr() == a2.val.as_ptr());

    let b1 = pool.check_out(Type::B, &type_b_allocator);
    let b1_addr = b1.val.as_ptr();
    pool.check_in(Type::B, b1);
    let b2 = pool.check_out(Type::B, &type_b_allocator);
    println!("b1 = b2 : {}", b2.val.as_ptr() == b1_addr);

    pool.check_in(Type::A, a1);
    pool.check_in(Type::A, a2);
    pool.check_in(Type::B, b2);

    println!();
    for (name, value) in pool.export_metrics() {
        println!("  {}: {}", name, value);
    }
}
