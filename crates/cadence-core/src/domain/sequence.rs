use std::time::Duration;

use super::{CountdownSegment, FocusPlan, PlanError};

/// Expands `total_work_time` into alternating work and break segments.
///
/// Work is consumed in `plan.work_duration` units; whatever is left over
/// becomes the final work segment, which is never followed by a break.
pub fn generate_sequence(
    plan: &FocusPlan,
    total_work_time: Duration,
) -> Result<Vec<CountdownSegment>, PlanError> {
    plan.validate_for_sequence()?;

    let long_break = match (plan.cycles, plan.long_break_duration) {
        (Some(cycles), Some(duration)) => Some((cycles, duration)),
        _ => None,
    };

    let mut sequence = Vec::new();
    let mut remaining_time = total_work_time;
    let mut remaining_cycles = long_break.map(|(cycles, _)| cycles);

    while remaining_time > plan.work_duration {
        sequence.push(CountdownSegment::Work(plan.work_duration));
        remaining_time -= plan.work_duration;

        match (remaining_cycles.as_mut(), long_break) {
            (Some(counter), Some((cycles, long_break_duration))) => {
                *counter -= 1;
                if *counter == 0 {
                    sequence.push(CountdownSegment::LongBreak(long_break_duration));
                    *counter = cycles;
                } else {
                    sequence.push(CountdownSegment::ShortBreak(plan.short_break_duration));
                }
            }
            _ => sequence.push(CountdownSegment::ShortBreak(plan.short_break_duration)),
        }
    }

    sequence.push(CountdownSegment::Work(remaining_time));
    Ok(sequence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::segment::total_duration;

    fn minutes(value: u64) -> Duration {
        Duration::from_secs(value * 60)
    }

    fn work(value: u64) -> CountdownSegment {
        CountdownSegment::Work(minutes(value))
    }

    fn short(value: u64) -> CountdownSegment {
        CountdownSegment::ShortBreak(minutes(value))
    }

    fn long(value: u64) -> CountdownSegment {
        CountdownSegment::LongBreak(minutes(value))
    }

    fn break_count(sequence: &[CountdownSegment]) -> usize {
        sequence.iter().filter(|segment| segment.is_break()).count()
    }

    #[test]
    fn pomodoro_over_130_minutes_matches_literal_trace() {
        let sequence = generate_sequence(&FocusPlan::pomodoro(), minutes(130)).unwrap();

        assert_eq!(
            sequence,
            vec![
                work(20),
                short(5),
                work(20),
                short(5),
                work(20),
                short(5),
                work(20),
                long(15),
                work(20),
                short(5),
                work(20),
                short(5),
                work(10),
            ]
        );
        assert_eq!(total_duration(&sequence), minutes(130 + 5 * 5 + 15));
    }

    #[test]
    fn total_at_most_one_work_unit_yields_single_segment() {
        let plan = FocusPlan::pomodoro();

        assert_eq!(generate_sequence(&plan, minutes(20)).unwrap(), vec![work(20)]);
        assert_eq!(generate_sequence(&plan, minutes(7)).unwrap(), vec![work(7)]);
        assert_eq!(
            generate_sequence(&plan, Duration::ZERO).unwrap(),
            vec![CountdownSegment::Work(Duration::ZERO)]
        );
    }

    #[test]
    fn exact_multiple_ends_with_full_work_segment() {
        let plan = FocusPlan::new("even", minutes(20), minutes(5));
        let sequence = generate_sequence(&plan, minutes(60)).unwrap();

        assert_eq!(
            sequence,
            vec![work(20), short(5), work(20), short(5), work(20)]
        );
    }

    #[test]
    fn plan_without_cycles_only_alternates_short_breaks() {
        let plan = FocusPlan::new("flat", minutes(25), minutes(5));
        let sequence = generate_sequence(&plan, minutes(200)).unwrap();

        assert!(!sequence
            .iter()
            .any(|segment| matches!(segment, CountdownSegment::LongBreak(_))));

        let body = &sequence[..sequence.len() - 1];
        for (position, segment) in body.iter().enumerate() {
            if position % 2 == 0 {
                assert!(segment.is_work(), "expected work at {position}");
            } else {
                assert_eq!(*segment, short(5), "expected short break at {position}");
            }
        }
    }

    #[test]
    fn every_nth_work_segment_is_followed_by_long_break() {
        let plan = FocusPlan::new("triple", minutes(10), minutes(2)).with_long_break(minutes(12), 3);
        let sequence = generate_sequence(&plan, minutes(125)).unwrap();

        let mut works_since_long_break = 0;
        for pair in sequence.windows(2) {
            if pair[0].is_work() {
                works_since_long_break += 1;
                if works_since_long_break == 3 {
                    assert_eq!(pair[1], long(12));
                    works_since_long_break = 0;
                } else {
                    assert_eq!(pair[1], short(2));
                }
            }
        }
    }

    #[test]
    fn terminal_segment_is_always_work() {
        let plans = [
            FocusPlan::pomodoro(),
            FocusPlan::new("flat", minutes(25), minutes(5)),
            FocusPlan::new("tiny", Duration::from_secs(1), Duration::from_secs(1)),
        ];

        for plan in plans {
            for total in [0, 1, 19, 20, 21, 59, 60, 61, 130, 481] {
                let sequence = generate_sequence(&plan, minutes(total)).unwrap();
                let last = sequence.last().unwrap();
                assert!(last.is_work(), "{} over {total}min", plan.name);
            }
        }
    }

    #[test]
    fn durations_add_up_to_work_time_plus_breaks() {
        let plan = FocusPlan::pomodoro();

        for total in [0u64, 1, 20, 21, 40, 41, 79, 80, 81, 130, 300] {
            let sequence = generate_sequence(&plan, minutes(total)).unwrap();

            let work_time: Duration = sequence
                .iter()
                .filter(|segment| segment.is_work())
                .map(CountdownSegment::duration)
                .sum();
            let break_time: Duration = sequence
                .iter()
                .filter(|segment| segment.is_break())
                .map(CountdownSegment::duration)
                .sum();

            assert_eq!(work_time, minutes(total));
            assert_eq!(total_duration(&sequence), minutes(total) + break_time);

            let expected_breaks = if total == 0 {
                0
            } else {
                total.div_ceil(20) as usize - 1
            };
            assert_eq!(break_count(&sequence), expected_breaks, "total {total}");
        }
    }

    #[test]
    fn generation_is_idempotent() {
        let plan = FocusPlan::pomodoro();

        let first = generate_sequence(&plan, minutes(173)).unwrap();
        let second = generate_sequence(&plan, minutes(173)).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn cycles_without_long_break_fail_fast() {
        let mut plan = FocusPlan::new("broken", minutes(20), minutes(5));
        plan.cycles = Some(4);

        let result = generate_sequence(&plan, minutes(130));

        assert_eq!(
            result,
            Err(PlanError::MissingLongBreak {
                name: "broken".to_string()
            })
        );
    }

    #[test]
    fn zero_work_duration_fails_instead_of_looping() {
        let plan = FocusPlan::new("stuck", Duration::ZERO, minutes(5));

        assert!(matches!(
            generate_sequence(&plan, minutes(10)),
            Err(PlanError::ZeroWorkDuration { .. })
        ));
    }
}
