//! Integration tests for whole programs.
//!
//! These tests parse Java source, run it from `main` and inspect the static
//! fields the program leaves behind.

extern crate jcse;

use std::cell::RefCell;
use std::rc::Rc;

use jcse::runner::api::{run_program, run_program_with, RunError};
use jcse::runner::config::MachineConfig;
use jcse::runner::ds::error::EvalError;
use jcse::runner::ds::value::{StashItem, Value};
use jcse::runner::eval::{evaluate, EvalContext};
use jcse::runner::plugin::NativeRegistry;

/// Helper to run a program to completion.
fn run(code: &str) -> EvalContext {
    let ctx = run_program(code).unwrap_or_else(|e| panic!("{}", e));
    assert!(ctx.is_finished(), "program did not finish");
    ctx
}

/// Helper to run a program that must fail at runtime.
fn run_err(code: &str) -> EvalError {
    match run_program(code) {
        Err(RunError::Eval(e)) => e,
        Err(e) => panic!("unexpected parse error {}", e),
        Ok(_) => panic!("expected a runtime error"),
    }
}

fn field(ctx: &EvalContext, class: &str, name: &str) -> Value {
    ctx.static_field(class, name)
        .unwrap_or_else(|e| panic!("{}.{}: {}", class, name, e))
}

fn string(s: &str) -> Value {
    Value::String(s.to_string())
}

#[test]
fn test_instance_methods_dispatch_on_runtime_class() {
    let ctx = run(r#"
        class Parent {
            static String staticName() { return "Parent"; }
            String name() { return "Parent"; }
        }
        class Child extends Parent {
            static String staticName() { return "Child"; }
            String name() { return "Child"; }
        }
        public class Main {
            static String dynamic;
            static String declared;
            public static void main(String[] args) {
                Parent p = new Child();
                dynamic = p.name();
                declared = p.staticName();
            }
        }
    "#);
    assert_eq!(field(&ctx, "Main", "dynamic"), string("Child"));
    assert_eq!(field(&ctx, "Main", "declared"), string("Parent"));
}

#[test]
fn test_overload_selection_by_static_types() {
    let ctx = run(r#"
        public class Main {
            static String a;
            static String b;
            static String c;
            static String d;
            static String f(int x) { return "int"; }
            static String f(long x) { return "long"; }
            static String f(double x) { return "double"; }
            static String f(int x, int y) { return "int,int"; }
            static String g(Object o) { return "Object"; }
            static String g(String s) { return "String"; }
            public static void main(String[] args) {
                a = f(1);
                b = f(1L);
                c = f(1.5);
                d = f(1, 2) + g("s") + g(null);
            }
        }
    "#);
    assert_eq!(field(&ctx, "Main", "a"), string("int"));
    assert_eq!(field(&ctx, "Main", "b"), string("long"));
    assert_eq!(field(&ctx, "Main", "c"), string("double"));
    assert_eq!(field(&ctx, "Main", "d"), string("int,intStringString"));
}

#[test]
fn test_overload_uses_declared_type_of_argument() {
    let ctx = run(r#"
        class Animal { }
        class Dog extends Animal { }
        public class Main {
            static String picked;
            static String kind(Animal a) { return "animal"; }
            static String kind(Dog d) { return "dog"; }
            public static void main(String[] args) {
                Animal a = new Dog();
                picked = kind(a) + "," + kind(new Dog());
            }
        }
    "#);
    assert_eq!(field(&ctx, "Main", "picked"), string("animal,dog"));
}

#[test]
fn test_ambiguous_overload() {
    let err = run_err(r#"
        public class Main {
            static void h(int a, long b) { }
            static void h(long a, int b) { }
            public static void main(String[] args) {
                h(1, 2);
            }
        }
    "#);
    assert!(matches!(err, EvalError::AmbiguousOverload(_)), "{:?}", err);
}

#[test]
fn test_no_applicable_overload() {
    let err = run_err(r#"
        public class Main {
            static void f(int a) { }
            public static void main(String[] args) {
                f("text");
            }
        }
    "#);
    assert!(matches!(err, EvalError::OverloadResolution(_)), "{:?}", err);

    let err = run_err(r#"
        public class Main {
            public static void main(String[] args) {
                missing();
            }
        }
    "#);
    assert!(matches!(err, EvalError::UndeclaredMethod(_)), "{:?}", err);
}

#[test]
fn test_field_initialisation_order() {
    let ctx = run(r#"
        class A {
            static String log = "";
            int a = mark("A.field");
            A() { mark("A.ctor"); }
            int mark(String s) { log = log + s + ";"; return 1; }
        }
        class B extends A {
            int b = mark("B.field");
            B() { mark("B.ctor"); }
        }
        public class Main {
            static String result;
            public static void main(String[] args) {
                B obj = new B();
                result = A.log;
            }
        }
    "#);
    assert_eq!(
        field(&ctx, "Main", "result"),
        string("A.field;A.ctor;B.field;B.ctor;")
    );
}

#[test]
fn test_constructors_and_super_calls() {
    let ctx = run(r#"
        class Point {
            int x;
            int y;
            Point(int x, int y) { this.x = x; this.y = y; }
            Point() { this(7, 8); }
            int sum() { return x + y; }
        }
        class Point3 extends Point {
            int z = 100;
            Point3(int z) { super(1, 2); this.z = this.z + z; }
            int sum() { return super.sum() + z; }
        }
        public class Main {
            static int a;
            static int b;
            public static void main(String[] args) {
                Point p = new Point();
                a = p.sum();
                Point q = new Point3(5);
                b = q.sum();
            }
        }
    "#);
    assert_eq!(field(&ctx, "Main", "a"), Value::int(15));
    assert_eq!(field(&ctx, "Main", "b"), Value::int(108));
}

#[test]
fn test_no_applicable_constructor() {
    let err = run_err(r#"
        class Box { Box(int size) { } }
        public class Main {
            public static void main(String[] args) {
                Box b = new Box();
            }
        }
    "#);
    assert!(matches!(err, EvalError::ConstructorOverloadResolution(_)), "{:?}", err);
}

#[test]
fn test_static_access_through_null_succeeds() {
    let ctx = run(r#"
        class Counter {
            static int total = 5;
            static int twice() { return total * 2; }
            int count;
        }
        public class Main {
            static int viaField;
            static int viaMethod;
            public static void main(String[] args) {
                Counter c = null;
                viaField = c.total;
                viaMethod = c.twice();
            }
        }
    "#);
    assert_eq!(field(&ctx, "Main", "viaField"), Value::int(5));
    assert_eq!(field(&ctx, "Main", "viaMethod"), Value::int(10));
}

#[test]
fn test_instance_access_through_null_faults() {
    let err = run_err(r#"
        class Counter { int count; }
        public class Main {
            public static void main(String[] args) {
                Counter c = null;
                int n = c.count;
            }
        }
    "#);
    assert!(matches!(err, EvalError::NullPointer(_)), "{:?}", err);

    let err = run_err(r#"
        class Counter { int get() { return 1; } }
        public class Main {
            public static void main(String[] args) {
                Counter c = null;
                c.get();
            }
        }
    "#);
    assert!(matches!(err, EvalError::NullPointer(_)), "{:?}", err);
}

#[test]
fn test_main_chosen_from_first_declaring_class() {
    let ctx = run(r#"
        class Helper {
            static void main(int x) { }
        }
        class First {
            static int ran;
            public static void main(String[] args) { ran = 1; }
        }
        class Second {
            static int ran;
            public static void main(String[] args) { ran = 2; }
        }
    "#);
    assert_eq!(field(&ctx, "First", "ran"), Value::int(1));
    assert_eq!(field(&ctx, "Second", "ran"), Value::int(0));
}

#[test]
fn test_missing_main() {
    assert_eq!(run_err("class A { }"), EvalError::NoMainMethod);
    assert_eq!(run_err(""), EvalError::NoMainMethod);
}

#[test]
fn test_loops_with_break_and_continue() {
    let ctx = run(r#"
        public class Main {
            static int sum;
            static int evens;
            static int count;
            public static void main(String[] args) {
                for (int i = 0; i < 10; i++) {
                    if (i == 7) break;
                    if (i % 2 == 1) continue;
                    evens += i;
                }
                int n = 0;
                while (n < 5) {
                    n++;
                    sum = sum + n;
                }
                count = n;
            }
        }
    "#);
    assert_eq!(field(&ctx, "Main", "evens"), Value::int(12));
    assert_eq!(field(&ctx, "Main", "sum"), Value::int(15));
    assert_eq!(field(&ctx, "Main", "count"), Value::int(5));
}

#[test]
fn test_switch_fall_through() {
    let ctx = run(r#"
        public class Main {
            static String out = "";
            static String name(int k) {
                String r = "";
                switch (k) {
                    case 1: r = r + "one";
                    case 2: r = r + "two"; break;
                    case -3: r = "minus three"; break;
                    default: r = "other";
                }
                return r;
            }
            public static void main(String[] args) {
                out = name(1) + "," + name(2) + "," + name(-3) + "," + name(9);
            }
        }
    "#);
    assert_eq!(
        field(&ctx, "Main", "out"),
        string("onetwo,two,minus three,other")
    );
}

#[test]
fn test_break_outside_loop() {
    let err = run_err(r#"
        public class Main {
            public static void main(String[] args) {
                break;
            }
        }
    "#);
    assert_eq!(err, EvalError::MissingMarker("break".to_string()));
}

#[test]
fn test_recursion() {
    let ctx = run(r#"
        public class Main {
            static int fact;
            static int fib;
            static int factorial(int n) {
                if (n <= 1) return 1;
                return n * factorial(n - 1);
            }
            static int fibonacci(int n) {
                if (n < 2) {
                    return n;
                } else {
                    return fibonacci(n - 1) + fibonacci(n - 2);
                }
            }
            public static void main(String[] args) {
                fact = factorial(10);
                fib = fibonacci(10);
            }
        }
    "#);
    assert_eq!(field(&ctx, "Main", "fact"), Value::int(3628800));
    assert_eq!(field(&ctx, "Main", "fib"), Value::int(55));
}

#[test]
fn test_strings_and_widening() {
    let ctx = run(r#"
        public class Main {
            static String s;
            static long wide;
            static double real;
            public static void main(String[] args) {
                s = "n=" + 4 + 'c' + true + 1.5;
                int small = 40;
                wide = small + 2;
                real = 3;
            }
        }
    "#);
    assert_eq!(field(&ctx, "Main", "s"), string("n=4ctrue1.5"));
    assert_eq!(field(&ctx, "Main", "wide"), Value::long(42));
    assert_eq!(field(&ctx, "Main", "real"), Value::double(3.0));
}

#[test]
fn test_increments_keep_variable_type() {
    let ctx = run(r#"
        public class Main {
            static String r;
            static char c;
            static long l;
            static long old;
            static int i;
            static int pre;
            public static void main(String[] args) {
                c = 'a';
                r = "" + c++;
                l = 9223372036854775806L;
                old = l++;
                i = 5;
                pre = --i;
                for (char d = 'x'; d < 'z'; d++) {
                    r = r + d;
                }
            }
        }
    "#);
    assert_eq!(field(&ctx, "Main", "r"), string("axy"));
    assert_eq!(field(&ctx, "Main", "c"), Value::Char('b'));
    assert_eq!(field(&ctx, "Main", "old"), Value::long(9223372036854775806));
    assert_eq!(field(&ctx, "Main", "l"), Value::long(i64::MAX));
    assert_eq!(field(&ctx, "Main", "pre"), Value::int(4));
    assert_eq!(field(&ctx, "Main", "i"), Value::int(4));
}

#[test]
fn test_increment_of_non_numeric_variable() {
    assert!(matches!(
        run_err(r#"
            public class Main {
                public static void main(String[] args) {
                    String t = "a";
                    t++;
                }
            }
        "#),
        EvalError::TypeMismatch(_)
    ));
}

#[test]
fn test_compound_assignment_casts_to_variable_type() {
    let ctx = run(r#"
        public class Main {
            static int x;
            static int i;
            static char ch;
            static String s;
            static int y;
            static int min;
            public static void main(String[] args) {
                x = 1;
                x += 1.5;
                i = 3;
                i *= 2L;
                ch = 'a';
                ch += 2;
                s = "n";
                s += 1;
                y = 10;
                y -= y = 3;
                min = -2147483648;
                min -= 1;
            }
        }
    "#);
    assert_eq!(field(&ctx, "Main", "x"), Value::int(2));
    assert_eq!(field(&ctx, "Main", "i"), Value::int(6));
    assert_eq!(field(&ctx, "Main", "ch"), Value::Char('c'));
    assert_eq!(field(&ctx, "Main", "s"), string("n1"));
    assert_eq!(field(&ctx, "Main", "y"), Value::int(7));
    assert_eq!(field(&ctx, "Main", "min"), Value::int(i32::MAX));
}

#[test]
fn test_superclass_declared_later() {
    let ctx = run(r#"
        public class Main {
            static String name;
            static int depth;
            public static void main(String[] args) {
                Child c = new Child();
                name = c.name();
                depth = c.depth;
            }
        }
        class Child extends Parent {
            Child() { this.depth = this.depth + 1; }
        }
        class Parent extends Root {
            String name() { return "Parent"; }
        }
        class Root {
            int depth = 1;
        }
    "#);
    assert_eq!(field(&ctx, "Main", "name"), string("Parent"));
    assert_eq!(field(&ctx, "Main", "depth"), Value::int(2));
}

#[test]
fn test_cyclic_inheritance() {
    assert!(matches!(
        run_err(r#"
            class A extends B { }
            class B extends A { }
            public class Main {
                public static void main(String[] args) { }
            }
        "#),
        EvalError::CyclicInheritance(_)
    ));
}

#[test]
fn test_arrays() {
    let ctx = run(r#"
        public class Main {
            static int n;
            static int argc;
            public static void main(String[] args) {
                int[] xs = new int[]{1, 2, 3};
                n = xs.length;
                argc = args.length;
            }
        }
    "#);
    assert_eq!(field(&ctx, "Main", "n"), Value::int(3));
    assert_eq!(field(&ctx, "Main", "argc"), Value::int(1));
}

#[test]
fn test_natives() {
    let printed = Rc::new(RefCell::new(Vec::<String>::new()));
    let sink = printed.clone();
    let mut natives = NativeRegistry::new();
    natives.register_closure("Main::print(String): void", move |_, stash, env| {
        let s = env.get_variable("s")?.borrow().value.clone();
        if let Some(v) = s {
            sink.borrow_mut().push(v.to_string());
        }
        stash.push(StashItem::Value(Value::Void));
        Ok(())
    });
    natives.register_closure("Main::twice(int): int", |_, stash, env| {
        let n = env.get_variable("n")?.borrow().value.clone();
        let n = match n {
            Some(Value::Number(n)) => n.as_i64() as i32,
            _ => 0,
        };
        stash.push(StashItem::Value(Value::int(n * 2)));
        Ok(())
    });

    let code = r#"
        public class Main {
            static native void print(String s);
            static native int twice(int n);
            static int result;
            public static void main(String[] args) {
                print("hello");
                result = twice(21);
                print("done " + result);
            }
        }
    "#;
    let ctx = run_program_with(code, MachineConfig::default(), natives)
        .unwrap_or_else(|e| panic!("{}", e));
    assert_eq!(field(&ctx, "Main", "result"), Value::int(42));
    assert_eq!(
        *printed.borrow(),
        vec!["hello".to_string(), "done 42".to_string()]
    );
}

#[test]
fn test_missing_native() {
    let err = run_err(r#"
        public class Main {
            static native int missing();
            public static void main(String[] args) {
                int x = missing();
            }
        }
    "#);
    assert_eq!(
        err,
        EvalError::NativeNotFound("Main::missing(): int".to_string())
    );
}

#[test]
fn test_step_limit_and_resume() {
    let code = r#"
        public class Main {
            static int total;
            public static void main(String[] args) {
                for (int i = 1; i <= 10; i++) {
                    total += i;
                }
            }
        }
    "#;
    let mut ctx = run_program_with(code, MachineConfig::with_step_limit(25), NativeRegistry::new())
        .unwrap_or_else(|e| panic!("{}", e));
    assert!(!ctx.is_finished());
    assert_eq!(ctx.total_steps, 25);

    evaluate(&mut ctx, usize::MAX).unwrap();
    assert!(ctx.is_finished());
    assert_eq!(field(&ctx, "Main", "total"), Value::int(55));
}

#[test]
fn test_redeclaration() {
    let err = run_err(r#"
        public class Main {
            public static void main(String[] args) {
                int x = 1;
                int x = 2;
            }
        }
    "#);
    assert_eq!(err, EvalError::Redeclaration("x".to_string()));
}

#[test]
fn test_shadowing_in_nested_block() {
    let ctx = run(r#"
        public class Main {
            static int outer;
            public static void main(String[] args) {
                int x = 1;
                {
                    int y = x + 1;
                    x = y * 10;
                }
                int y = 3;
                outer = x + y;
            }
        }
    "#);
    assert_eq!(field(&ctx, "Main", "outer"), Value::int(23));
}

#[test]
fn test_unassigned_variable() {
    let err = run_err(r#"
        public class Main {
            public static void main(String[] args) {
                int x;
                int y = x + 1;
            }
        }
    "#);
    assert_eq!(err, EvalError::UnassignedVariable("x".to_string()));
}

#[test]
fn test_independent_contexts() {
    let code = r#"
        public class Main {
            static int hits;
            public static void main(String[] args) { hits = hits + 1; }
        }
    "#;
    let first = run(code);
    let second = run(code);
    assert_eq!(field(&first, "Main", "hits"), Value::int(1));
    assert_eq!(field(&second, "Main", "hits"), Value::int(1));
}
