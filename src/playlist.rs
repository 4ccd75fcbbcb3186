//! Playlists ordered by emotional similarity
//!
//! Ordering is a greedy nearest-neighbour tour over each song's average
//! (arousal, valence): start at the first analysed song and repeatedly hop
//! to the closest song not yet visited.

use crate::error::Result;
use crate::features::FeatureExtractor;
use crate::inference::ModelRunner;
use crate::song::Song;
use crate::types::EmotionPoint;
use tracing::{debug, warn};

/// Greedy nearest-neighbour order over `points`, starting at index 0
///
/// Ties go to the lowest index, so the result is deterministic.
pub fn nearest_neighbour_order(points: &[EmotionPoint]) -> Vec<usize> {
    if points.is_empty() {
        return Vec::new();
    }

    let mut visited = vec![false; points.len()];
    let mut order = Vec::with_capacity(points.len());
    let mut current = 0;
    visited[0] = true;
    order.push(0);

    while order.len() < points.len() {
        let next = (0..points.len())
            .filter(|&i| !visited[i])
            .fold(None::<(usize, f32)>, |best, i| {
                let d = points[current].distance(&points[i]);
                match best {
                    Some((_, best_d)) if best_d <= d => best,
                    _ => Some((i, d)),
                }
            });

        let Some((next, _)) = next else { break };
        visited[next] = true;
        order.push(next);
        current = next;
    }

    order
}

#[derive(Debug, Clone, Default)]
pub struct Playlist {
    songs: Vec<Song>,
}

impl Playlist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_songs(songs: Vec<Song>) -> Self {
        Self { songs }
    }

    pub fn push(&mut self, song: Song) {
        self.songs.push(song);
    }

    pub fn songs(&self) -> &[Song] {
        &self.songs
    }

    pub fn into_songs(self) -> Vec<Song> {
        self.songs
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    /// Analyse every song with a shared runner
    ///
    /// Stops at the first model error; per-song input errors are logged and
    /// the song stays unanalysed. Returns the number of analysed songs.
    pub fn analyze_all(&mut self, extractor: &FeatureExtractor, runner: &ModelRunner) -> Result<usize> {
        let mut analyzed = 0;
        for song in &mut self.songs {
            match song.analyze_with(extractor, runner) {
                Ok(_) => analyzed += 1,
                Err(e) if e.is_recoverable() => warn!("Skipping '{}': {}", song.title(), e),
                Err(e) => return Err(e),
            }
        }
        Ok(analyzed)
    }

    /// Average emotion of each song, in playlist order
    pub fn averages(&self) -> Vec<Option<EmotionPoint>> {
        self.songs.iter().map(Song::average_emotion).collect()
    }

    /// Indices of the songs in nearest-neighbour order
    ///
    /// Unanalysed songs keep their relative order after the analysed ones.
    pub fn sorted_order(&self) -> Vec<usize> {
        let (analyzed, points): (Vec<usize>, Vec<EmotionPoint>) = self
            .songs
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.average_emotion().map(|p| (i, p)))
            .unzip();

        let mut order: Vec<usize> = nearest_neighbour_order(&points)
            .into_iter()
            .map(|k| analyzed[k])
            .collect();

        order.extend((0..self.songs.len()).filter(|i| !analyzed.contains(i)));
        debug!("Playlist order: {:?}", order);
        order
    }

    /// Reorder the songs in place by [`Playlist::sorted_order`]
    pub fn sort(&mut self) {
        let order = self.sorted_order();
        let mut slots: Vec<Option<Song>> = self.songs.drain(..).map(Some).collect();
        self.songs = order.into_iter().filter_map(|i| slots[i].take()).collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioSource;
    use crate::features::FeatureBatch;
    use crate::inference::{Device, EmotionModel};

    #[test]
    fn test_nearest_neighbour_order() {
        let points = [
            EmotionPoint::new(0.0, 0.0),
            EmotionPoint::new(5.0, 5.0),
            EmotionPoint::new(0.1, 0.0),
            EmotionPoint::new(4.9, 5.0),
            EmotionPoint::new(1.0, 1.0),
        ];
        assert_eq!(nearest_neighbour_order(&points), vec![0, 2, 4, 3, 1]);
    }

    #[test]
    fn test_nearest_neighbour_edge_cases() {
        assert!(nearest_neighbour_order(&[]).is_empty());
        assert_eq!(nearest_neighbour_order(&[EmotionPoint::default()]), vec![0]);

        // Equal distances resolve to the lowest index
        let points = [
            EmotionPoint::new(0.0, 0.0),
            EmotionPoint::new(1.0, 0.0),
            EmotionPoint::new(-1.0, 0.0),
        ];
        assert_eq!(nearest_neighbour_order(&points), vec![0, 1, 2]);
    }

    /// Mean log-mel energy as arousal
    struct LevelModel;

    impl EmotionModel for LevelModel {
        fn predict(&self, batch: &FeatureBatch) -> Result<Vec<EmotionPoint>> {
            Ok(batch
                .outer_iter()
                .map(|m| EmotionPoint::new(m.mean().unwrap_or(0.0), 0.0))
                .collect())
        }

        fn device(&self) -> Device {
            Device::Cpu
        }

        fn name(&self) -> &'static str {
            "level"
        }
    }

    fn song(amplitude: f32) -> Song {
        let samples = (0..44100)
            .map(|i| amplitude * (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 44100.0).sin())
            .collect();
        Song::with_device(AudioSource::buffer(samples, 44100), Device::Cpu).unwrap()
    }

    #[test]
    fn test_sort_groups_similar_songs() {
        let mut playlist = Playlist::from_songs(vec![song(0.0), song(0.9), song(0.01), song(0.8)]);
        let analyzed = playlist
            .analyze_all(&FeatureExtractor::new(), &ModelRunner::with_model(LevelModel))
            .unwrap();
        assert_eq!(analyzed, 4);
        assert!(playlist.averages().iter().all(Option::is_some));

        assert_eq!(playlist.sorted_order(), vec![0, 2, 3, 1]);
        playlist.sort();
        assert_eq!(playlist.len(), 4);
        assert_eq!(playlist.songs()[0].average_arousal(), Some(0.0));
    }

    #[test]
    fn test_unanalyzed_songs_go_last() {
        let mut analyzed = song(0.5);
        analyzed
            .analyze_with(&FeatureExtractor::new(), &ModelRunner::with_model(LevelModel))
            .unwrap();
        let playlist = Playlist::from_songs(vec![song(0.1), analyzed, song(0.2)]);

        assert_eq!(playlist.sorted_order(), vec![1, 0, 2]);
        assert_eq!(playlist.averages()[0], None);
    }
}
