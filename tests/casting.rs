//! Borrow-preserving handle casts: exactly one borrow unit moves with the
//! handle — never duplicated, never silently dropped.

use std::any::Any;
use std::fmt::Write as _;

use quiesce::{Handle, Owner};

trait Shape {
    fn area(&self) -> f64;
}

#[derive(Debug, PartialEq)]
struct Circle {
    radius: f64,
}

impl Shape for Circle {
    fn area(&self) -> f64 {
        core::f64::consts::PI * self.radius * self.radius
    }
}

#[derive(Debug)]
struct Square {
    side: f64,
}

impl Shape for Square {
    fn area(&self) -> f64 {
        self.side * self.side
    }
}

#[test]
fn upcast_to_trait_object() {
    let owner = Owner::new(Circle { radius: 1.0 });
    let circle = owner.try_handle().expect("active");
    assert_eq!(owner.borrow_count(), 1);

    let shape: Handle<'_, dyn Shape> = Handle::map(circle, |c| c as &dyn Shape);
    assert!((shape.area() - core::f64::consts::PI).abs() < 1e-12);
    assert_eq!(owner.borrow_count(), 1, "upcast moves the unit, not a copy");

    drop(shape);
    assert_eq!(owner.borrow_count(), 0);
}

#[test]
fn map_projects_a_field() {
    struct Config {
        name: String,
        retries: u32,
    }

    let owner = Owner::new(Config {
        name: String::from("edge"),
        retries: 3,
    });

    let config = owner.try_handle().expect("active");
    let name = Handle::map(config, |c| c.name.as_str());
    assert_eq!(&*name, "edge");
    assert_eq!(owner.borrow_count(), 1);
    drop(name);

    let retries = Handle::map(owner.try_handle().expect("active"), |c| &c.retries);
    assert_eq!(*retries, 3);
    drop(retries);
    assert_eq!(owner.borrow_count(), 0);
}

#[test]
fn downcast_success_transfers_the_borrow() {
    let owner = Owner::new(Circle { radius: 2.0 });
    let handle = owner.try_handle().expect("active");
    let any = Handle::map(handle, |c| c as &(dyn Any + Send + Sync));

    let circle = any.downcast::<Circle>().expect("it is a Circle");
    assert_eq!(*circle, Circle { radius: 2.0 });
    assert_eq!(owner.borrow_count(), 1);

    drop(circle);
    assert_eq!(owner.borrow_count(), 0);
}

#[test]
fn downcast_failure_leaves_source_intact() {
    let owner = Owner::new(Circle { radius: 2.0 });
    let any = Handle::map(owner.try_handle().expect("active"), |c| {
        c as &(dyn Any + Send + Sync)
    });

    let any = any.downcast::<Square>().expect_err("not a Square");

    // All-or-nothing: the source still dereferences and still accounts
    // for exactly one borrow.
    assert_eq!(owner.borrow_count(), 1);
    assert!(any.is::<Circle>());

    // And it can still be downcast correctly afterwards.
    let circle = any.downcast::<Circle>().expect("retry succeeds");
    assert_eq!(circle.radius, 2.0);
    drop(circle);
    assert_eq!(owner.borrow_count(), 0);
}

#[test]
fn filter_map_is_all_or_nothing() {
    let owner = Owner::new(vec![1u32, 2, 3]);
    let handle = owner.try_handle().expect("active");

    let handle = Handle::filter_map(handle, |v| v.get(9)).expect_err("out of bounds");
    assert_eq!(owner.borrow_count(), 1);
    assert_eq!(handle.len(), 3);

    let last = Handle::filter_map(handle, |v| v.last()).expect("non-empty");
    assert_eq!(*last, 3);
    assert_eq!(owner.borrow_count(), 1);
    drop(last);
    assert_eq!(owner.borrow_count(), 0);
}

#[test]
fn chained_casts_release_one_unit() {
    let owner = Owner::new(Circle { radius: 0.5 });

    let concrete = owner.try_handle().expect("active");
    let any = Handle::map(concrete, |c| c as &(dyn Any + Send + Sync));
    let back = any.downcast::<Circle>().expect("round trip");
    let shape = Handle::map(back, |c| c as &dyn Shape);

    assert_eq!(owner.borrow_count(), 1, "one unit across the whole chain");
    drop(shape);
    assert_eq!(owner.borrow_count(), 0);

    owner.retire();
    assert!(owner.try_reclaim());
}

#[test]
fn call_through_and_formatting() {
    let owner = Owner::new(|x: i32| x * 2);
    let double = owner.try_handle().expect("active");
    assert_eq!((*double)(21), 42);
    drop(double);

    let text = Owner::new(String::from("fmt"));
    let handle = text.try_handle().expect("active");
    let mut rendered = String::new();
    write!(rendered, "{handle} / {handle:?}").unwrap();
    assert_eq!(rendered, "fmt / \"fmt\"");
}

#[test]
fn get_matches_deref() {
    let owner = Owner::new(11u64);
    let handle = owner.try_handle().expect("active");
    assert_eq!(handle.get(), &*handle);
}
