//! Property tests for the median filter pipeline, driven through the public API.

use core::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use dht_median_sensor::{
    ChipModel, Clock, DhtDriver, FilteredSensor, HardwareReader, MAX_MEDIAN_COUNT, Quantity,
    RollingWindow, TemperatureUnit,
};
use proptest::prelude::*;

struct Scripted(VecDeque<Option<f32>>);

impl DhtDriver for Scripted {
    type Error = &'static str;

    fn read_retry(
        &mut self,
        _model: ChipModel,
        _pin: &str,
    ) -> Result<(Option<f32>, Option<f32>), Self::Error> {
        match self.0.pop_front() {
            Some(Some(t)) => Ok((None, Some(t))),
            _ => Err("no response"),
        }
    }
}

#[derive(Clone, Default)]
struct Ticks(Rc<Cell<u64>>);

impl Clock for Ticks {
    fn now_ms(&self) -> u64 {
        let now = self.0.get();
        self.0.set(now + 60_000);
        now
    }
}

fn reader(script: impl IntoIterator<Item = Option<f32>>) -> RefCell<HardwareReader<Scripted, Ticks>> {
    RefCell::new(HardwareReader::new(
        Scripted(script.into_iter().collect()),
        Ticks::default(),
        ChipModel::Dht22,
        heapless::String::try_from("4").unwrap(),
    ))
}

/// Tenths of a degree inside the accepted range, excluding zero which the
/// reader treats as missing.
fn plausible_celsius() -> impl Strategy<Value = f32> {
    (-200i32..800)
        .prop_filter("zero reads as missing", |t| *t != 0)
        .prop_map(|t| t as f32 / 10.0)
}

fn odd_median_count() -> impl Strategy<Value = usize> {
    (0..=(MAX_MEDIAN_COUNT - 1) / 2).prop_map(|k| 2 * k + 1)
}

proptest! {
    /// Once N accepted samples have arrived, the displayed value is the
    /// element at (N-1)/2 of the last N samples, sorted.
    #[test]
    fn displays_lower_median_of_last_n(
        n in odd_median_count(),
        samples in proptest::collection::vec(plausible_celsius(), 1..40),
    ) {
        let reader = reader(samples.iter().copied().map(Some));
        let mut sensor =
            FilteredSensor::new(&reader, "Prop", Quantity::Temperature, TemperatureUnit::Celsius, n)
                .unwrap();

        for _ in 0..samples.len() {
            sensor.update();
        }

        if samples.len() < n {
            prop_assert_eq!(sensor.displayed_value(), None);
        } else {
            let mut last: Vec<f32> = samples[samples.len() - n..].to_vec();
            last.sort_by(f32::total_cmp);
            prop_assert_eq!(sensor.displayed_value(), Some(last[(n - 1) / 2]));
        }
    }

    /// The window never grows past its capacity, whatever mix of pushes and
    /// decays it sees.
    #[test]
    fn window_stays_bounded(
        n in odd_median_count(),
        ops in proptest::collection::vec(proptest::option::of(-50.0f32..50.0), 0..64),
    ) {
        let mut window = RollingWindow::new(n).unwrap();
        let mut model: VecDeque<f32> = VecDeque::new();
        for op in ops {
            match op {
                Some(v) => {
                    window.push(v);
                    model.push_back(v);
                    if model.len() > n {
                        model.pop_front();
                    }
                }
                None => {
                    prop_assert_eq!(window.decay(), model.pop_front());
                }
            }
            prop_assert!(window.len() <= n);
            prop_assert!(window.iter().eq(model.iter().copied()));
        }
    }

    /// A sensor that keeps failing drains completely and ends up unknown,
    /// holding its last median until the window is empty.
    #[test]
    fn failures_drain_to_unknown(
        n in odd_median_count(),
        samples in proptest::collection::vec(plausible_celsius(), 15..20),
    ) {
        let script: Vec<Option<f32>> = samples.iter().copied().map(Some).collect();
        let reader = reader(script);
        let mut sensor =
            FilteredSensor::new(&reader, "Prop", Quantity::Temperature, TemperatureUnit::Celsius, n)
                .unwrap();
        for _ in 0..samples.len() {
            sensor.update();
        }
        let median = sensor.displayed_value();
        prop_assert!(median.is_some());

        for _ in 0..n {
            sensor.update();
            prop_assert_eq!(sensor.displayed_value(), median);
        }
        prop_assert!(sensor.window().is_empty());
        sensor.update();
        prop_assert_eq!(sensor.displayed_value(), None);
    }
}
