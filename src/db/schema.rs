pub const SCHEMA: &str = r#"
-- Photos table: core photo metadata with per-field provenance
CREATE TABLE IF NOT EXISTS photos (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    uid TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL DEFAULT '',
    title_src TEXT NOT NULL DEFAULT '',
    caption TEXT NOT NULL DEFAULT '',
    caption_src TEXT NOT NULL DEFAULT '',

    -- Capture time, UTC and local wall clock
    taken_at TEXT NOT NULL,
    taken_at_local TEXT NOT NULL,
    taken_src TEXT NOT NULL DEFAULT '',
    time_zone TEXT NOT NULL DEFAULT '',
    year INTEGER NOT NULL DEFAULT -1,   -- -1 when unknown
    month INTEGER NOT NULL DEFAULT -1,
    day INTEGER NOT NULL DEFAULT -1,

    -- Location
    lat REAL NOT NULL DEFAULT 0,
    lng REAL NOT NULL DEFAULT 0,
    altitude INTEGER NOT NULL DEFAULT 0,
    country TEXT NOT NULL DEFAULT 'zz',
    place_src TEXT NOT NULL DEFAULT '',

    -- Flags
    favorite INTEGER NOT NULL DEFAULT 0,
    private INTEGER NOT NULL DEFAULT 0,

    -- Exposure
    iso INTEGER NOT NULL DEFAULT 0,
    focal_length INTEGER NOT NULL DEFAULT 0,
    f_number REAL NOT NULL DEFAULT 0,
    exposure TEXT NOT NULL DEFAULT '',

    -- Bookkeeping
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    edited_at TEXT,             -- last user edit
    checked_at TEXT,            -- last metadata worker pass, NULL = needs re-check
    deleted_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_photos_taken_at ON photos(taken_at);
CREATE INDEX IF NOT EXISTS idx_photos_checked_at ON photos(checked_at);

-- Details: free-text metadata kept out of the main row
CREATE TABLE IF NOT EXISTS details (
    photo_id INTEGER PRIMARY KEY,
    keywords TEXT NOT NULL DEFAULT '',   -- comma separated
    keywords_src TEXT NOT NULL DEFAULT '',
    notes TEXT NOT NULL DEFAULT '',
    notes_src TEXT NOT NULL DEFAULT '',
    subject TEXT NOT NULL DEFAULT '',
    subject_src TEXT NOT NULL DEFAULT '',
    artist TEXT NOT NULL DEFAULT '',
    artist_src TEXT NOT NULL DEFAULT '',
    copyright TEXT NOT NULL DEFAULT '',
    copyright_src TEXT NOT NULL DEFAULT '',
    license TEXT NOT NULL DEFAULT '',
    license_src TEXT NOT NULL DEFAULT '',
    FOREIGN KEY (photo_id) REFERENCES photos(id) ON DELETE CASCADE
);

-- Albums
CREATE TABLE IF NOT EXISTS albums (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    uid TEXT NOT NULL UNIQUE,
    slug TEXT NOT NULL,
    title TEXT NOT NULL,
    album_type TEXT NOT NULL DEFAULT 'album',
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    deleted_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_albums_slug ON albums(slug);

-- Album membership; removal hides the row instead of deleting it
CREATE TABLE IF NOT EXISTS photos_albums (
    photo_uid TEXT NOT NULL,
    album_uid TEXT NOT NULL,
    hidden INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    PRIMARY KEY (photo_uid, album_uid)
);

CREATE INDEX IF NOT EXISTS idx_photos_albums_album ON photos_albums(album_uid);

-- Labels
CREATE TABLE IF NOT EXISTS labels (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    uid TEXT NOT NULL UNIQUE,
    slug TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    priority INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    deleted_at TEXT
);

-- Photo-label associations; uncertainty 100 marks a blocked label
CREATE TABLE IF NOT EXISTS photos_labels (
    photo_id INTEGER NOT NULL,
    label_id INTEGER NOT NULL,
    label_src TEXT NOT NULL,
    uncertainty INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (photo_id, label_id),
    FOREIGN KEY (photo_id) REFERENCES photos(id) ON DELETE CASCADE,
    FOREIGN KEY (label_id) REFERENCES labels(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_photos_labels_label ON photos_labels(label_id);
"#;
