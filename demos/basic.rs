use rulekit::{ArrayTarget, Compiler, Context, Operators, Parameters, Record};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let compiler = Compiler::in_memory();
    let target = ArrayTarget::new();

    // Compile a rule
    let rule = "user.age >= :min_age and user.status = 'active'";
    let executor = compiler
        .compile(rule, &target, &mut Context::new())
        .expect("failed to compile rule");

    println!("{}", executor.source());

    // Compiling the same rule again reuses the executor
    let again = compiler
        .compile(rule, &target, &mut Context::new())
        .expect("failed to compile rule");
    println!("same executor: {}", std::sync::Arc::ptr_eq(&executor, &again));

    // Filter some records
    let people = vec![
        Record::new().set("user.name", "Ada").set("user.age", 36_i64).set("user.status", "active"),
        Record::new().set("user.name", "Bo").set("user.age", 16_i64).set("user.status", "active"),
        Record::new().set("user.name", "Cy").set("user.age", 52_i64).set("user.status", "inactive"),
    ];
    let params = Parameters::new().set("min_age", 18_i64);

    match executor.filter(&people, &Operators::new(), &params) {
        Ok(kept) => {
            for person in kept {
                if let Some(name) = person.get("user.name") {
                    println!("Matched: {name}");
                }
            }
        }
        Err(err) => println!("Execution failed: {err}"),
    }
}
