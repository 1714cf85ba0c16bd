use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use tinylisp::{eval, make_prelude_environment, make_root_environment, parse_program, tokenize};

// A reasonably complex program for benchmarking
const BENCH_PROGRAM: &str = r#"
; Calculate the nth Fibonacci number
(define fib (\ (n)
  (if (< n 2)
      n
      (+ (fib (- n 1))
         (fib (- n 2))))))

(define fact (\ (n)
  (if (= n 0)
      1
      (* n (fact (- n 1))))))

(define add-all (\ (& xs) (join xs)))

; Some calls
(fib 10)
(fact 20)
(list "string with spaces" true false 123 -10 +)
(list "string with escapes \"\n\r\t\"" (head (list 1 2 3)) (tail (list 1 2 3)))
"#;

fn bench_reader(c: &mut Criterion) {
    let input = BENCH_PROGRAM.repeat(8);
    let mut group = c.benchmark_group("Reader");

    group.bench_with_input(
        BenchmarkId::new("tokenize", "program_x8"),
        &input,
        |b, input| b.iter(|| tokenize(black_box(input))),
    );
    group.bench_with_input(
        BenchmarkId::new("parse_program", "program_x8"),
        &input,
        |b, input| b.iter(|| parse_program(black_box(input))),
    );

    group.finish();
}

fn bench_evaluator(c: &mut Criterion) {
    let mut group = c.benchmark_group("Evaluator");

    let forms = match parse_program(BENCH_PROGRAM) {
        Ok(forms) => forms,
        Err(err) => panic!("benchmark program failed to parse: {}", err),
    };
    group.bench_function("program", |b| {
        b.iter(|| {
            let env = make_root_environment();
            for form in &forms {
                black_box(eval(&env, form));
            }
        })
    });

    for n in [10, 15] {
        let env = make_root_environment();
        for form in &forms[..2] {
            eval(&env, form);
        }
        let call = match parse_program(&format!("(fib {})", n)) {
            Ok(mut forms) => forms.remove(0),
            Err(err) => panic!("fib call failed to parse: {}", err),
        };
        group.bench_with_input(BenchmarkId::new("fib", n), &call, |b, call| {
            b.iter(|| eval(&env, black_box(call)))
        });
    }

    let env = match make_prelude_environment() {
        Ok(env) => env,
        Err(err) => panic!("prelude failed to load: {}", err),
    };
    let pipeline = match parse_program("(sum (map (\\ (x) (* x x)) (filter (\\ (x) (> x 2)) (list 1 2 3 4 5 6 7 8 9 10))))") {
        Ok(mut forms) => forms.remove(0),
        Err(err) => panic!("pipeline failed to parse: {}", err),
    };
    group.bench_function("prelude_pipeline", |b| {
        b.iter(|| eval(&env, black_box(&pipeline)))
    });

    group.finish();
}

criterion_group!(benches, bench_reader, bench_evaluator);
criterion_main!(benches);
