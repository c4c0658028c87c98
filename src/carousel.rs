/// Index of the account on display. The list length is passed in on every
/// call, so the carousel never holds a stale copy of it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Carousel {
    current_index: usize,
}

impl Carousel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn index(&self) -> usize {
        self.current_index
    }

    pub fn current(&self, len: usize) -> Option<usize> {
        (self.current_index < len).then_some(self.current_index)
    }

    pub fn next(&mut self, len: usize) {
        if len == 0 {
            return;
        }
        self.current_index = (self.current_index + 1) % len;
    }

    pub fn previous(&mut self, len: usize) {
        if len == 0 {
            return;
        }
        self.current_index = (self.current_index % len + len - 1) % len;
    }

    /// Resets to the first account once the index falls off the end of the list.
    pub fn repair(&mut self, len: usize) -> bool {
        if self.current_index >= len && self.current_index != 0 {
            self.current_index = 0;
            return true;
        }
        false
    }

    #[cfg(test)]
    pub fn jump_to(&mut self, index: usize, len: usize) {
        if index < len {
            self.current_index = index;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_and_previous_wrap() {
        let mut carousel = Carousel::new();
        carousel.next(3);
        carousel.next(3);
        assert_eq!(carousel.index(), 2);
        carousel.next(3);
        assert_eq!(carousel.index(), 0);
        carousel.previous(3);
        assert_eq!(carousel.index(), 2);
    }

    #[test]
    fn next_then_previous_is_identity() {
        for len in 1..6 {
            for start in 0..len {
                let mut carousel = Carousel::new();
                carousel.jump_to(start, len);

                carousel.next(len);
                carousel.previous(len);
                assert_eq!(carousel.index(), start);

                carousel.previous(len);
                carousel.next(len);
                assert_eq!(carousel.index(), start);
            }
        }
    }

    #[test]
    fn single_account_never_moves() {
        let mut carousel = Carousel::new();
        carousel.next(1);
        assert_eq!(carousel.index(), 0);
        carousel.previous(1);
        assert_eq!(carousel.index(), 0);
    }

    #[test]
    fn empty_list_is_a_no_op() {
        let mut carousel = Carousel::new();
        carousel.next(0);
        carousel.previous(0);
        assert_eq!(carousel.current(0), None);
        assert!(!carousel.repair(0));
    }

    #[test]
    fn shrinking_past_the_index_resets_to_zero() {
        let mut carousel = Carousel::new();
        carousel.jump_to(2, 3);
        assert!(carousel.repair(2));
        assert_eq!(carousel.index(), 0);

        carousel.jump_to(1, 3);
        assert!(!carousel.repair(2));
        assert_eq!(carousel.index(), 1);

        assert!(carousel.repair(0));
        assert_eq!(carousel.current(0), None);
    }

    #[test]
    fn index_stays_in_bounds_under_mixed_operations() {
        let mut carousel = Carousel::new();
        let mut len = 4usize;
        // Deterministic walk over next/previous/grow/shrink.
        let mut seed = 0x2545_f491_u32;
        for _ in 0..500 {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            match seed % 4 {
                0 => carousel.next(len),
                1 => carousel.previous(len),
                2 => len += 1,
                _ => {
                    len = len.saturating_sub(1);
                    carousel.repair(len);
                }
            }
            if len > 0 {
                assert!(carousel.index() < len);
            }
        }
    }
}
