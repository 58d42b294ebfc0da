#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::cell::cell;
    use crate::formula::Formula;
    use crate::timeline::untracked;

    #[test]
    fn test_cell_basic() {
        let c = cell(42);
        assert_eq!(c.get(), 42);

        c.set(100);
        assert_eq!(c.get(), 100);

        c.update(|v| *v += 1);
        assert_eq!(c.get(), 101);
    }

    #[test]
    fn test_formula_caches_between_invalidations() {
        let input = cell(1);
        let runs = Rc::new(RefCell::new(0));

        let doubled = Formula::new({
            let input = input.clone();
            let runs = runs.clone();
            move || {
                *runs.borrow_mut() += 1;
                input.get() * 2
            }
        });

        // Lazy: nothing runs until the first read.
        assert_eq!(*runs.borrow(), 0);

        assert_eq!(doubled.read(), 2);
        assert_eq!(doubled.read(), 2);
        assert_eq!(*runs.borrow(), 1);

        input.set(5);
        assert_eq!(doubled.read(), 10);
        assert_eq!(*runs.borrow(), 2);
    }

    #[test]
    fn test_formula_ignores_unrelated_writes() {
        let tracked = cell(1);
        let unrelated = cell(0);
        let runs = Rc::new(RefCell::new(0));

        let f = Formula::new({
            let tracked = tracked.clone();
            let runs = runs.clone();
            move || {
                *runs.borrow_mut() += 1;
                tracked.get()
            }
        });

        assert_eq!(f.read(), 1);
        unrelated.set(99);
        assert_eq!(f.read(), 1);
        assert_eq!(*runs.borrow(), 1);
    }

    #[test]
    fn test_nested_formula_forwards_dependencies() {
        let base = cell(2);

        let inner = Formula::new({
            let base = base.clone();
            move || base.get() * 10
        });

        let outer_runs = Rc::new(RefCell::new(0));
        let outer = Formula::new({
            let inner = inner.clone();
            let outer_runs = outer_runs.clone();
            move || {
                *outer_runs.borrow_mut() += 1;
                inner.read() + 1
            }
        });

        assert_eq!(outer.read(), 21);
        assert_eq!(*outer_runs.borrow(), 1);

        // Changing the inner formula's input must invalidate the outer one.
        base.set(3);
        assert_eq!(outer.read(), 31);
        assert_eq!(*outer_runs.borrow(), 2);
    }

    #[test]
    fn test_untracked_read_is_not_a_dependency() {
        let seen = cell(1);
        let hidden = cell(10);
        let runs = Rc::new(RefCell::new(0));

        let f = Formula::new({
            let seen = seen.clone();
            let hidden = hidden.clone();
            let runs = runs.clone();
            move || {
                *runs.borrow_mut() += 1;
                seen.get() + untracked(|| hidden.get())
            }
        });

        assert_eq!(f.read(), 11);
        hidden.set(20);
        assert_eq!(f.read(), 11); // stale value: hidden was never tracked
        assert_eq!(*runs.borrow(), 1);

        seen.set(2);
        assert_eq!(f.read(), 22);
        assert_eq!(*runs.borrow(), 2);
    }

    #[test]
    fn test_write_during_compute_keeps_formula_stale() {
        let counter = cell(1);
        let runs = Rc::new(RefCell::new(0));

        let f = Formula::new({
            let counter = counter.clone();
            let runs = runs.clone();
            move || {
                *runs.borrow_mut() += 1;
                let v = counter.get();
                if v < 3 {
                    // A write landing while the formula computes must not be
                    // masked by the freshly filled cache.
                    counter.set(v + 1);
                }
                v
            }
        });

        assert_eq!(f.read(), 1);
        assert_eq!(f.read(), 2);
        assert_eq!(f.read(), 3);
        assert_eq!(f.read(), 3);
        assert_eq!(*runs.borrow(), 3);
    }

    #[test]
    fn test_constant_formula_never_recomputes() {
        let runs = Rc::new(RefCell::new(0));
        let f = Formula::new({
            let runs = runs.clone();
            move || {
                *runs.borrow_mut() += 1;
                7
            }
        });

        assert_eq!(f.read(), 7);
        assert_eq!(f.read(), 7);
        assert_eq!(*runs.borrow(), 1);
    }
}
